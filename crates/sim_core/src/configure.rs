//! Scenario configuration: builds a `World` from a map, oracle, search
//! strategy, resource feed, and run parameters, and schedules the initial
//! events (§4.2 "Configure"): spawn agents, spawn resources, call
//! `build_scenario`, then let the dispatcher take over.

use std::sync::Arc;

use bevy_ecs::prelude::{Entity, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::batch::BatchWindow;
use crate::clock::{EventKind, EventQueue, EventSubject};
use crate::dispatcher::schedule_agent_move;
use crate::ecs::{Agent, EmptyAgent, Resource, ResourceState};
use crate::error::DataError;
use crate::feed::ResourceFeed;
use crate::map::{LocationOnRoad, MapAndOracle};
use crate::matching::AssignmentPolicy;
use crate::resources::{MapResource, RunConfig, StrategyResource};
use crate::scoreboard::Scoreboard;
use crate::strategy::SearchStrategy;

/// Parameters from the §6 configuration surface that drive scenario
/// construction. Parsing a TOML file into this shape is `sim_cli`'s job
/// (C14); this struct is the validated result.
#[derive(Debug, Clone)]
pub struct ScenarioParams {
    pub number_of_agents: u64,
    pub resource_maximum_lifetime: u64,
    pub assignment_period: u64,
    pub assignment_algorithm: AssignmentPolicy,
    pub agent_placement_seed: u64,
    /// §6 `speedReductionFactor`, in `(0, 1]`. Defaults to `1.0` (no
    /// slowdown) via `Default`; `sim_cli` always sets it explicitly from the
    /// validated config.
    pub speed_reduction_factor: f64,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            number_of_agents: 1,
            resource_maximum_lifetime: 600,
            assignment_period: 30,
            assignment_algorithm: AssignmentPolicy::Fair,
            agent_placement_seed: 0,
            speed_reduction_factor: 1.0,
        }
    }
}

/// Picks a random intersection that has at least one outgoing road, and a
/// random outgoing road from it. Degenerates to the first intersection with
/// any outgoing road if random sampling keeps landing on dead ends (bounded
/// retries), which only matters for pathologically sparse maps.
fn place_agent(map: &dyn MapAndOracle, rng: &mut StdRng) -> Option<LocationOnRoad> {
    let intersections = map.intersections();
    if intersections.is_empty() {
        return None;
    }
    for _ in 0..32 {
        let idx = rng.gen_range(0..intersections.len());
        let candidate = intersections[idx].id;
        let roads = map.roads_from(candidate);
        if !roads.is_empty() {
            let road_idx = rng.gen_range(0..roads.len());
            return Some(LocationOnRoad::start_of(roads[road_idx].id));
        }
    }
    intersections.iter().find_map(|i| map.roads_from(i.id).first().map(|r| LocationOnRoad::start_of(r.id)))
}

/// Builds the `World`: inserts the consumed-interface resources, the
/// scoreboard and batch window, spawns `params.number_of_agents` agents
/// placed via the seeded RNG, spawns one entity per feed row, and schedules
/// every agent's first `AgentMove` plus every resource's `ResourceAnnounce`.
/// Returns the computed `simulation_end_time` (the last resource's
/// `expiration_time`).
pub fn build_scenario(
    world: &mut World,
    map: Arc<dyn MapAndOracle>,
    strategy: Arc<dyn SearchStrategy>,
    feed: &dyn ResourceFeed,
    params: ScenarioParams,
) -> Result<u64, DataError> {
    world.insert_resource(EventQueue::default());
    world.insert_resource(BatchWindow::default());
    world.insert_resource(Scoreboard::default());
    world.insert_resource(MapResource(map.clone()));
    world.insert_resource(StrategyResource(strategy));

    let mut rng = StdRng::seed_from_u64(params.agent_placement_seed);
    let mut agent_entities: Vec<Entity> = Vec::with_capacity(params.number_of_agents as usize);
    for id in 0..params.number_of_agents {
        let loc = place_agent(map.as_ref(), &mut rng).ok_or(DataError::LocationOffMap { row: 0 })?;
        let entity = world.spawn((Agent::new(id, loc), EmptyAgent)).id();
        agent_entities.push(entity);
    }

    let mut max_expiration = 0u64;
    for (row_idx, row) in feed.rows().iter().enumerate() {
        if row.fare <= 0.0 {
            return Err(DataError::NonPositiveFare { row: row_idx, fare: row.fare });
        }
        let raw_trip_duration = map.travel_time(row.pickup_loc, row.dropoff_loc);
        if raw_trip_duration == u64::MAX {
            return Err(DataError::LocationOffMap { row: row_idx });
        }
        let trip_duration = crate::map::apply_speed_reduction(raw_trip_duration, params.speed_reduction_factor);
        let expiration_time = row.announce_time + params.resource_maximum_lifetime;
        max_expiration = max_expiration.max(expiration_time);

        let resource = Resource {
            id: row_idx as u64,
            announce_time: row.announce_time,
            pickup_loc: row.pickup_loc,
            dropoff_loc: row.dropoff_loc,
            trip_duration,
            fare: row.fare,
            expiration_time,
            state: ResourceState::Announced,
        };
        let entity = world.spawn(resource).id();
        world.resource_mut::<Scoreboard>().total_resources += 1;
        world.resource_mut::<EventQueue>().schedule(
            row.announce_time,
            EventKind::ResourceAnnounce,
            Some(EventSubject::Resource(entity)),
            0,
        );
    }

    for &agent_entity in &agent_entities {
        schedule_agent_move(world, agent_entity, 0);
    }

    world.insert_resource(RunConfig {
        batch_frame: params.assignment_period,
        assignment_policy: params.assignment_algorithm,
        simulation_end_time: max_expiration,
        number_of_agents: params.number_of_agents,
        speed_reduction_factor: params.speed_reduction_factor,
    });

    Ok(max_expiration)
}
