//! Property-based invariant checks (§8.1): the Scoreboard/Report arithmetic
//! holds for arbitrary counter values, and two runs built from identical
//! inputs never diverge.

mod support;

use proptest::prelude::*;

use sim_core::dispatcher::run_until_empty;
use sim_core::matching::AssignmentPolicy;
use sim_core::scoreboard::Scoreboard;

use support::{loc, single_road_map, TestScenarioBuilder};

proptest! {
    /// Whatever a run accumulates, `total_assignments` plus `expired_resources`
    /// must reconstruct `total_resources` exactly: every resource that was
    /// ever spawned ends up either assigned or expired, never both, never
    /// neither.
    #[test]
    fn total_assignments_and_expired_reconstruct_total_resources(
        total_resources in 0u64..1000,
        expired_resources in 0u64..1000,
        total_resource_wait_time in 0u64..100_000,
        total_agents in 0u64..50,
    ) {
        let expired_resources = expired_resources.min(total_resources);
        let mut board = Scoreboard::default();
        board.total_resources = total_resources;
        board.expired_resources = expired_resources;
        board.total_resource_wait_time = total_resource_wait_time;

        let report = board.report(total_agents);

        prop_assert_eq!(report.total_assignments + report.expired_resources, total_resources);
        prop_assert!(report.expiration_percent >= 0.0 && report.expiration_percent <= 100.0);
        if total_resources > 0 {
            prop_assert!(report.average_wait_time <= total_resource_wait_time);
        } else {
            prop_assert_eq!(report.average_wait_time, 0);
            prop_assert_eq!(report.expiration_percent, 0.0);
        }
    }

    /// Two scenarios built from the same parameters, resources, and seed
    /// must produce bit-identical reports: nothing in the kernel consults
    /// wall-clock time or unseeded randomness.
    #[test]
    fn identical_inputs_produce_identical_reports(
        number_of_agents in 1u64..4,
        lifetime in 50u64..500,
        batch_frame in 1u64..20,
        seed in 0u64..1000,
        announce_gaps in prop::collection::vec(0u64..15, 1..6),
        fare in 1.0f64..200.0,
    ) {
        let build = || {
            let mut builder = TestScenarioBuilder::new(single_road_map(10_000))
                .agents(number_of_agents)
                .lifetime(lifetime)
                .batch_frame(batch_frame)
                .seed(seed)
                .policy(AssignmentPolicy::Fair);
            let mut t = 0u64;
            for gap in &announce_gaps {
                t += gap;
                builder = builder.resource(t, loc(0, 0), loc(0, 200), fare);
            }
            let mut world = builder.build();
            run_until_empty(&mut world, 100_000).unwrap();
            let scoreboard = world.resource::<Scoreboard>();
            (
                scoreboard.total_resources,
                scoreboard.expired_resources,
                scoreboard.pool_count,
                (scoreboard.total_fare * 1_000.0).round() as i64,
                scoreboard.total_resource_wait_time,
            )
        };

        prop_assert_eq!(build(), build());
    }
}
