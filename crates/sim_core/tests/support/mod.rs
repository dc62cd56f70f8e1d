#![allow(dead_code)]

use std::sync::Arc;

use bevy_ecs::prelude::World;

use sim_core::configure::{build_scenario, ScenarioParams};
use sim_core::feed::{ResourceFeed, ResourceRow};
use sim_core::map::{InMemoryMap, Intersection, LocationOnRoad, MapAndOracle, Road};
use sim_core::matching::AssignmentPolicy;
use sim_core::strategy::{RandomWalkStrategy, SearchStrategy};

/// A resource feed backed by an explicit row list, so scenario tests can set
/// announce times and locations directly instead of round-tripping CSV text.
pub struct InlineFeed(pub Vec<ResourceRow>);

impl ResourceFeed for InlineFeed {
    fn rows(&self) -> &[ResourceRow] {
        &self.0
    }
}

pub fn loc(road: u32, offset: u64) -> LocationOnRoad {
    LocationOnRoad { road, travel_time_from_start: offset }
}

/// A single straight road long enough that no agent finishes crossing it
/// mid-test, so an agent's announced spawn location stays put for the
/// duration of the scenario unless the test explicitly lets it roam.
pub fn single_road_map(duration_secs: u64) -> InMemoryMap {
    let intersections = vec![
        Intersection { id: 0, lat: 0.0, lon: 0.0 },
        Intersection { id: 1, lat: 0.0, lon: 1.0 },
    ];
    let roads = vec![Road { id: 0, from: 0, to: 1, duration_secs }];
    InMemoryMap::new(intersections, roads)
}

/// Builds a `World` through the same `configure::build_scenario` entry point
/// `sim_cli` uses, with a fluent builder for the handful of run parameters
/// these scenario tests vary.
pub struct TestScenarioBuilder {
    map: InMemoryMap,
    rows: Vec<ResourceRow>,
    number_of_agents: u64,
    resource_maximum_lifetime: u64,
    assignment_period: u64,
    assignment_algorithm: AssignmentPolicy,
    agent_placement_seed: u64,
    speed_reduction_factor: f64,
}

impl TestScenarioBuilder {
    pub fn new(map: InMemoryMap) -> Self {
        Self {
            map,
            rows: Vec::new(),
            number_of_agents: 1,
            resource_maximum_lifetime: 600,
            assignment_period: 5,
            assignment_algorithm: AssignmentPolicy::Fair,
            agent_placement_seed: 1,
            speed_reduction_factor: 1.0,
        }
    }

    pub fn agents(mut self, n: u64) -> Self {
        self.number_of_agents = n;
        self
    }

    pub fn lifetime(mut self, secs: u64) -> Self {
        self.resource_maximum_lifetime = secs;
        self
    }

    pub fn batch_frame(mut self, secs: u64) -> Self {
        self.assignment_period = secs;
        self
    }

    pub fn policy(mut self, policy: AssignmentPolicy) -> Self {
        self.assignment_algorithm = policy;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.agent_placement_seed = seed;
        self
    }

    pub fn speed_factor(mut self, factor: f64) -> Self {
        self.speed_reduction_factor = factor;
        self
    }

    pub fn resource(mut self, announce_time: u64, pickup: LocationOnRoad, dropoff: LocationOnRoad, fare: f64) -> Self {
        self.rows.push(ResourceRow {
            announce_time,
            pickup_loc: pickup,
            dropoff_loc: dropoff,
            fare,
        });
        self
    }

    pub fn build(self) -> World {
        let map: Arc<dyn MapAndOracle> = Arc::new(self.map);
        let strategy: Arc<dyn SearchStrategy> = Arc::new(RandomWalkStrategy::new(self.agent_placement_seed));
        let feed = InlineFeed(self.rows);
        let params = ScenarioParams {
            number_of_agents: self.number_of_agents,
            resource_maximum_lifetime: self.resource_maximum_lifetime,
            assignment_period: self.assignment_period,
            assignment_algorithm: self.assignment_algorithm,
            agent_placement_seed: self.agent_placement_seed,
            speed_reduction_factor: self.speed_reduction_factor,
        };
        let mut world = World::new();
        build_scenario(&mut world, map, strategy, &feed, params).expect("scenario builds");
        world
    }
}
