//! Cost-Matrix Builder (C7): enumerates candidate agents for each batch
//! resource and packs them into a dense weight matrix for the optimal
//! matcher. The greedy matcher (C8) bypasses this and works on the raw
//! per-resource candidate lists directly.

use std::collections::HashMap;

use bevy_ecs::prelude::Entity;

use super::policy::AssignmentPolicy;
use super::types::Candidate;

/// Floor for the infeasible-cell sentinel (§4.5). The actual sentinel used
/// by a given build is `max(INFEASIBLE_FLOOR, 4 * max_feasible_weight + 1)`
/// so it can never collide with a legitimate `pickup_time / fare` weight
/// even when fares are small (§9 open question).
pub const INFEASIBLE_FLOOR: f64 = 50_000.0;

/// Dense weight matrix over a batch: rows index batch resources (in batch
/// order), columns index the distinct agent ids that were a candidate for
/// at least one resource in the batch (sorted by agent id for determinism).
pub struct CostMatrix {
    pub resources: Vec<Entity>,
    pub agents: Vec<Entity>,
    /// `weights[i][j]`: weight of matching `resources[i]` to `agents[j]`, or
    /// `sentinel` if infeasible.
    pub weights: Vec<Vec<f64>>,
    /// `feasible[i][j]`: whether the pair is an actual candidate. Tracked
    /// explicitly rather than inferred from `weights[i][j] < sentinel`, so a
    /// pathological weight can never be mistaken for a feasible one.
    pub feasible: Vec<Vec<bool>>,
    /// `pickup_times[i][j]`: the real agent-to-pickup travel time for a
    /// feasible cell (meaningless for infeasible ones). Kept separate from
    /// `weights` because under the Optimum policy the weight is `pickup_time
    /// / fare`, not the pickup time itself — a matcher reading schedule
    /// timing off `weights` would corrupt the event queue.
    pub pickup_times: Vec<Vec<u64>>,
    pub sentinel: f64,
}

impl CostMatrix {
    /// `candidates[i]` is the candidate list for `resources[i]`, where each
    /// candidate pairs an agent with its pickup time to that resource.
    /// `fares[i]` is `resources[i]`'s fare.
    pub fn build(
        resources: &[Entity],
        fares: &[f64],
        candidates: &[Vec<Candidate>],
        policy: AssignmentPolicy,
    ) -> Self {
        assert_eq!(resources.len(), fares.len());
        assert_eq!(resources.len(), candidates.len());

        let mut agent_set: Vec<Entity> = candidates
            .iter()
            .flat_map(|row| row.iter().map(|c| c.agent))
            .collect();
        agent_set.sort_by_key(|e| e.index());
        agent_set.dedup();

        let col_of: HashMap<Entity, usize> =
            agent_set.iter().enumerate().map(|(j, a)| (*a, j)).collect();

        let m = resources.len();
        let n = agent_set.len();

        let mut raw_weight = vec![vec![f64::NAN; n]; m];
        let mut feasible = vec![vec![false; n]; m];
        let mut pickup_times = vec![vec![0u64; n]; m];
        let mut max_feasible: f64 = 0.0;

        for (i, row) in candidates.iter().enumerate() {
            for candidate in row {
                let j = col_of[&candidate.agent];
                let w = policy.weight(candidate.pickup_time, fares[i]);
                raw_weight[i][j] = w;
                feasible[i][j] = true;
                pickup_times[i][j] = candidate.pickup_time;
                if w > max_feasible {
                    max_feasible = w;
                }
            }
        }

        let sentinel = INFEASIBLE_FLOOR.max(4.0 * max_feasible + 1.0);
        let weights: Vec<Vec<f64>> = raw_weight
            .into_iter()
            .map(|row| row.into_iter().map(|w| if w.is_nan() { sentinel } else { w }).collect())
            .collect();

        Self {
            resources: resources.to_vec(),
            agents: agent_set,
            weights,
            feasible,
            pickup_times,
            sentinel,
        }
    }

    pub fn rows(&self) -> usize {
        self.resources.len()
    }

    pub fn cols(&self) -> usize {
        self.agents.len()
    }
}
