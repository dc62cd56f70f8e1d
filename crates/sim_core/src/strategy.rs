//! Pluggable agent search strategy: decides where an empty agent cruises.
//!
//! Consumed interface (§6): `next_intersection(agent, current_intersection)`
//! and the optional `on_assignment` hook. Deterministic for a given seed.
//! This module also ships `RandomWalkStrategy`, a reference implementation
//! good enough to run the kernel standalone; production deployments supply
//! their own (e.g. a learned repositioning heuristic).

use bevy_ecs::prelude::Entity;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use crate::ecs::Resource;
use crate::map::{Intersection, IntersectionId, Map};

/// Capability set a production strategy implements. Must be deterministic
/// for a given seed (§6). Receives no direct references to mutable
/// agent/resource state — only the arguments passed in, per §5's "shared
/// resources" rule.
pub trait SearchStrategy: Send + Sync {
    /// Choose the next intersection for an empty agent currently at
    /// `current_intersection`. Must return an intersection reachable by a
    /// road leading out of `current_intersection`, or the dispatcher raises
    /// `StrategyError::NonAdjacentIntersection`.
    fn next_intersection(
        &self,
        agent: Entity,
        current_intersection: IntersectionId,
        map: &dyn Map,
    ) -> IntersectionId;

    /// Optional hook invoked when an agent is assigned a resource.
    fn on_assignment(&self, _agent: Entity, _resource: &Resource) {}
}

/// Deterministic seeded random walk: picks uniformly among the roads leading
/// out of the agent's current intersection. Falls back to staying in place
/// (returning the same intersection) when the intersection is a dead end —
/// callers must handle a strategy that never moves a stranded agent.
pub struct RandomWalkStrategy {
    rng: Mutex<StdRng>,
}

impl RandomWalkStrategy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl SearchStrategy for RandomWalkStrategy {
    fn next_intersection(
        &self,
        _agent: Entity,
        current_intersection: IntersectionId,
        map: &dyn Map,
    ) -> IntersectionId {
        let roads = map.roads_from(current_intersection);
        if roads.is_empty() {
            return current_intersection;
        }
        let mut rng = self.rng.lock().expect("random walk rng poisoned");
        let idx = rng.gen_range(0..roads.len());
        roads[idx].to
    }
}

/// Fixture strategy for tests: cycles through a fixed sequence of
/// intersections regardless of the map, ignoring adjacency. Useful for
/// constructing deterministic scenarios without depending on random choice.
pub struct ScriptedStrategy {
    script: Vec<IntersectionId>,
    cursor: Mutex<usize>,
}

impl ScriptedStrategy {
    pub fn new(script: Vec<IntersectionId>) -> Self {
        Self {
            script,
            cursor: Mutex::new(0),
        }
    }
}

impl SearchStrategy for ScriptedStrategy {
    fn next_intersection(
        &self,
        _agent: Entity,
        current_intersection: IntersectionId,
        _map: &dyn Map,
    ) -> IntersectionId {
        if self.script.is_empty() {
            return current_intersection;
        }
        let mut cursor = self.cursor.lock().expect("scripted strategy cursor poisoned");
        let next = self.script[*cursor % self.script.len()];
        *cursor += 1;
        next
    }
}

pub fn intersection_or_panic(map: &dyn Map, id: IntersectionId) -> &Intersection {
    map.intersection(id)
        .expect("strategy returned an intersection id absent from the map")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{InMemoryMap, Road};

    fn triangle_map() -> InMemoryMap {
        let intersections = vec![
            Intersection { id: 0, lat: 0.0, lon: 0.0 },
            Intersection { id: 1, lat: 0.0, lon: 1.0 },
            Intersection { id: 2, lat: 1.0, lon: 0.0 },
        ];
        let roads = vec![
            Road { id: 0, from: 0, to: 1, duration_secs: 5 },
            Road { id: 1, from: 0, to: 2, duration_secs: 5 },
        ];
        InMemoryMap::new(intersections, roads)
    }

    #[test]
    fn random_walk_only_returns_adjacent_intersections() {
        let map = triangle_map();
        let strategy = RandomWalkStrategy::new(42);
        let agent = Entity::from_raw(0);
        for _ in 0..50 {
            let next = strategy.next_intersection(agent, 0, &map);
            assert!(next == 1 || next == 2);
        }
    }

    #[test]
    fn random_walk_is_deterministic_for_a_seed() {
        let map = triangle_map();
        let a = RandomWalkStrategy::new(7);
        let b = RandomWalkStrategy::new(7);
        let agent = Entity::from_raw(0);
        let seq_a: Vec<_> = (0..10).map(|_| a.next_intersection(agent, 0, &map)).collect();
        let seq_b: Vec<_> = (0..10).map(|_| b.next_intersection(agent, 0, &map)).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn dead_end_stays_in_place() {
        let intersections = vec![Intersection { id: 0, lat: 0.0, lon: 0.0 }];
        let map = InMemoryMap::new(intersections, vec![]);
        let strategy = RandomWalkStrategy::new(1);
        let agent = Entity::from_raw(0);
        assert_eq!(strategy.next_intersection(agent, 0, &map), 0);
    }

    #[test]
    fn scripted_strategy_cycles() {
        let map = triangle_map();
        let strategy = ScriptedStrategy::new(vec![1, 2]);
        let agent = Entity::from_raw(0);
        assert_eq!(strategy.next_intersection(agent, 0, &map), 1);
        assert_eq!(strategy.next_intersection(agent, 0, &map), 2);
        assert_eq!(strategy.next_intersection(agent, 0, &map), 1);
    }
}
