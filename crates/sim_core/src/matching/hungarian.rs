//! Optimal Matcher (C9), policy P2: solves the batch assignment as a
//! maximum-weight bipartite matching over the negated cost matrix (minimum
//! cost <=> maximum weight), via `pathfinding`'s Kuhn-Munkres.

use pathfinding::kuhn_munkres::{kuhn_munkres, Weights};

use super::cost_matrix::CostMatrix;
use super::types::MatchResult;
use crate::error::InvariantViolation;

/// Scale factor converting the matrix's f64 weights to the i64 domain
/// Kuhn-Munkres operates in.
const SCALE: f64 = 1_000_000.0;

struct I64Weights(Vec<Vec<i64>>);

impl Weights<i64> for I64Weights {
    fn rows(&self) -> usize {
        self.0.len()
    }

    fn columns(&self) -> usize {
        self.0.first().map_or(0, |r| r.len())
    }

    fn at(&self, row: usize, col: usize) -> i64 {
        self.0[row][col]
    }

    fn neg(&self) -> Self {
        I64Weights(self.0.iter().map(|r| r.iter().map(|&x| x.saturating_neg()).collect()).collect())
    }
}

fn to_i64(weight: f64) -> i64 {
    let scaled = weight * SCALE;
    if scaled >= i64::MAX as f64 {
        i64::MAX
    } else if scaled <= i64::MIN as f64 {
        i64::MIN
    } else {
        scaled as i64
    }
}

/// Runs Kuhn-Munkres over `matrix`, minimizing total weight (negating for
/// the library's maximization convention). Kuhn-Munkres requires rows <=
/// columns, so when there are more resources than candidate agents the
/// matrix is transposed and the assignment direction is flipped back when
/// reading results out.
///
/// Returns `InvariantViolation::SentinelSelected` if the solver ever picks
/// an infeasible cell — this can only happen if a resource has strictly
/// fewer feasible candidates than the batch needs to fill every row, which
/// the caller should treat as a carried-over resource instead of a bug.
pub fn hungarian_match(matrix: &CostMatrix) -> Result<Vec<MatchResult>, InvariantViolation> {
    if matrix.rows() == 0 || matrix.cols() == 0 {
        return Ok(Vec::new());
    }

    let transposed = matrix.rows() > matrix.cols();
    let (rows, cols) = if transposed {
        (matrix.cols(), matrix.rows())
    } else {
        (matrix.rows(), matrix.cols())
    };

    let mut negated = vec![vec![0i64; cols]; rows];
    for r in 0..rows {
        for c in 0..cols {
            let (i, j) = if transposed { (c, r) } else { (r, c) };
            negated[r][c] = -to_i64(matrix.weights[i][j]);
        }
    }

    let weights = I64Weights(negated);
    let (_total, assignments) = kuhn_munkres(&weights);

    let mut results = Vec::new();
    for (row, &col) in assignments.iter().enumerate() {
        let (resource_idx, agent_idx) = if transposed { (col, row) } else { (row, col) };
        if resource_idx >= matrix.rows() || agent_idx >= matrix.cols() {
            continue;
        }
        if !matrix.feasible[resource_idx][agent_idx] {
            return Err(InvariantViolation::SentinelSelected {
                row: resource_idx,
                col: agent_idx,
            });
        }
        results.push(MatchResult {
            resource: matrix.resources[resource_idx],
            agent: matrix.agents[agent_idx],
            pickup_time: matrix.pickup_times[resource_idx][agent_idx],
            weight: matrix.weights[resource_idx][agent_idx],
        });
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::policy::AssignmentPolicy;
    use crate::matching::types::Candidate;
    use bevy_ecs::prelude::Entity;

    #[test]
    fn minimizes_total_weight_over_a_square_batch() {
        // Greedy-by-row-scan would take R0->A0 (1) then R1->A1 (100) = 101.
        // Optimum takes R0->A1 (2) + R1->A0 (2) = 4.
        let r0 = Entity::from_raw(0);
        let r1 = Entity::from_raw(1);
        let a0 = Entity::from_raw(10);
        let a1 = Entity::from_raw(11);
        let candidates = vec![
            vec![
                Candidate { agent: a0, pickup_time: 1 },
                Candidate { agent: a1, pickup_time: 2 },
            ],
            vec![
                Candidate { agent: a0, pickup_time: 2 },
                Candidate { agent: a1, pickup_time: 100 },
            ],
        ];
        let matrix =
            CostMatrix::build(&[r0, r1], &[10.0, 10.0], &candidates, AssignmentPolicy::Fair);
        let results = hungarian_match(&matrix).unwrap();
        assert_eq!(results.len(), 2);
        let total: u64 = results.iter().map(|m| m.pickup_time).sum();
        assert_eq!(total, 4);
        let r0_match = results.iter().find(|m| m.resource == r0).unwrap();
        assert_eq!(r0_match.agent, a1);
    }

    #[test]
    fn more_resources_than_agents_transposes_correctly() {
        let r0 = Entity::from_raw(0);
        let r1 = Entity::from_raw(1);
        let a0 = Entity::from_raw(10);
        let candidates = vec![
            vec![Candidate { agent: a0, pickup_time: 7 }],
            vec![Candidate { agent: a0, pickup_time: 3 }],
        ];
        let matrix =
            CostMatrix::build(&[r0, r1], &[10.0, 10.0], &candidates, AssignmentPolicy::Fair);
        let results = hungarian_match(&matrix).unwrap();
        // Only one agent exists; at most one resource can be matched, and it
        // must be the cheaper pairing.
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].resource, r1);
        assert_eq!(results[0].agent, a0);
    }

    #[test]
    fn empty_batch_returns_no_matches() {
        let matrix = CostMatrix::build(&[], &[], &[], AssignmentPolicy::Optimum);
        assert!(hungarian_match(&matrix).unwrap().is_empty());
    }

    #[test]
    fn optimum_policy_reports_real_pickup_time_not_the_benefit_weight() {
        // 2 resources, fares 10 and 100; pickup times R1->[A1=5,A2=100],
        // R2->[A1=10,A2=20]. Weight matrix (pickup_time/fare) is
        // [[0.5,10],[0.1,0.2]]; the true minimum-weight assignment is
        // (R1,A1)=0.5 + (R2,A2)=0.2 = 0.7, cheaper than the cross pairing
        // (R1,A2)=10 + (R2,A1)=0.1 = 10.1. Whichever pairing wins, the
        // reported `pickup_time` must be the raw travel time for that pair,
        // never the weight used only to choose the assignment.
        let r1 = Entity::from_raw(0);
        let r2 = Entity::from_raw(1);
        let a1 = Entity::from_raw(10);
        let a2 = Entity::from_raw(11);
        let candidates = vec![
            vec![
                Candidate { agent: a1, pickup_time: 5 },
                Candidate { agent: a2, pickup_time: 100 },
            ],
            vec![
                Candidate { agent: a1, pickup_time: 10 },
                Candidate { agent: a2, pickup_time: 20 },
            ],
        ];
        let matrix =
            CostMatrix::build(&[r1, r2], &[10.0, 100.0], &candidates, AssignmentPolicy::Optimum);
        let results = hungarian_match(&matrix).unwrap();
        assert_eq!(results.len(), 2);

        let r1_match = results.iter().find(|m| m.resource == r1).unwrap();
        let r2_match = results.iter().find(|m| m.resource == r2).unwrap();
        // Optimal pairing: (R1,A1) and (R2,A2), total weight 0.7.
        assert_eq!(r1_match.agent, a1);
        assert_eq!(r1_match.pickup_time, 5);
        assert!((r1_match.weight - 0.5).abs() < 1e-9);
        assert_eq!(r2_match.agent, a2);
        assert_eq!(r2_match.pickup_time, 20);
        assert!((r2_match.weight - 0.2).abs() < 1e-9);

        let total_weight: f64 = results.iter().map(|m| m.weight).sum();
        assert!((total_weight - 0.7).abs() < 1e-9);
    }
}
