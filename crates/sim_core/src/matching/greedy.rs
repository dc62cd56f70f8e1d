//! Greedy Matcher (C8), policy P1: iteratively picks the global minimum
//! pickup time, reserves that agent, and removes the pair. Operates
//! directly on the per-resource candidate lists — no dense matrix required.

use bevy_ecs::prelude::Entity;
use std::collections::HashSet;

use super::types::{Candidate, MatchResult};

/// `resources[i]` pairs with `candidates[i]`, its candidate list. Returns
/// one `MatchResult` per resource that got matched; resources with no
/// remaining candidates at termination are simply absent from the result
/// (callers carry them into the next window).
///
/// Tie-breaking is deterministic: ties in `pickup_time` are broken by batch
/// order, then candidate-list order (first-found wins).
pub fn greedy_match(resources: &[Entity], candidates: &[Vec<Candidate>]) -> Vec<MatchResult> {
    assert_eq!(resources.len(), candidates.len());

    let mut remaining: Vec<Vec<Candidate>> = candidates.to_vec();
    let mut resource_done = vec![false; resources.len()];
    let mut taken_agents: HashSet<Entity> = HashSet::new();
    let mut results = Vec::new();

    loop {
        let mut best: Option<(usize, usize)> = None; // (resource_idx, candidate_idx)
        let mut best_pickup = u64::MAX;

        for (i, row) in remaining.iter().enumerate() {
            if resource_done[i] {
                continue;
            }
            for (k, candidate) in row.iter().enumerate() {
                if taken_agents.contains(&candidate.agent) {
                    continue;
                }
                if candidate.pickup_time < best_pickup {
                    best_pickup = candidate.pickup_time;
                    best = Some((i, k));
                }
            }
        }

        let Some((i, k)) = best else {
            break;
        };

        let candidate = remaining[i][k];
        taken_agents.insert(candidate.agent);
        resource_done[i] = true;
        results.push(MatchResult {
            resource: resources[i],
            agent: candidate.agent,
            pickup_time: candidate.pickup_time,
            weight: candidate.pickup_time as f64,
        });
    }

    results
}
