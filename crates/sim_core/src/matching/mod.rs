//! Assignment: matching waiting resources to empty agents at the close of a
//! batch window (C6-C9).
//!
//! - `cost_matrix`: builds the dense weight matrix a batch needs (C7).
//! - `greedy`: policy P1 (Fair), operating on raw candidate lists (C8).
//! - `hungarian`: policy P2 (Optimum), solving the dense matrix via
//!   Kuhn-Munkres (C9).
//! - `policy`: selects which weight function and matcher a run uses.
//! - `types`: the shared `Candidate`/`MatchResult` data.

pub mod cost_matrix;
pub mod greedy;
pub mod hungarian;
pub mod policy;
pub mod types;

pub use cost_matrix::CostMatrix;
pub use greedy::greedy_match;
pub use hungarian::hungarian_match;
pub use policy::AssignmentPolicy;
pub use types::{Candidate, MatchResult};

use bevy_ecs::prelude::Entity;

use crate::error::InvariantViolation;

/// Dispatches to the matcher `policy` selects: the greedy scan for `Fair`
/// (cheap, works directly off candidate lists) or Kuhn-Munkres for
/// `Optimum` (needs the dense cost matrix).
pub fn run_batch_match(
    resources: &[Entity],
    fares: &[f64],
    candidates: &[Vec<Candidate>],
    policy: AssignmentPolicy,
) -> Result<Vec<MatchResult>, InvariantViolation> {
    match policy {
        AssignmentPolicy::Fair => Ok(greedy_match(resources, candidates)),
        AssignmentPolicy::Optimum => {
            let matrix = CostMatrix::build(resources, fares, candidates, policy);
            hungarian_match(&matrix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fair_policy_dispatches_to_greedy() {
        let r0 = Entity::from_raw(0);
        let a0 = Entity::from_raw(10);
        let candidates = vec![vec![Candidate { agent: a0, pickup_time: 5 }]];
        let results =
            run_batch_match(&[r0], &[10.0], &candidates, AssignmentPolicy::Fair).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].agent, a0);
    }

    #[test]
    fn optimum_policy_dispatches_to_hungarian() {
        let r0 = Entity::from_raw(0);
        let a0 = Entity::from_raw(10);
        let candidates = vec![vec![Candidate { agent: a0, pickup_time: 5 }]];
        let results =
            run_batch_match(&[r0], &[10.0], &candidates, AssignmentPolicy::Optimum).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].agent, a0);
    }
}
