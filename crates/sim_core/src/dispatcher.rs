//! Event Dispatcher (C5): pops the next event, routes it to a handler,
//! reinjects follow-up events.
//!
//! Event routing here is a plain `match` over `EventKind` rather than a
//! `bevy_ecs::Schedule` of `run_if`-gated systems: handlers need to
//! propagate `Result<(), SimError>` (an `InvariantViolation` must abort the
//! run, not be silently skipped), which a `Schedule` of fire-and-forget
//! systems can't do without extra plumbing. `World` access still goes
//! through plain `bevy_ecs` queries/components — only the control flow that
//! picks which handler runs is custom.

use log::{info, trace};

use bevy_ecs::prelude::{Entity, World};

use crate::batch::BatchWindow;
use crate::clock::{Event, EventKind, EventQueue, EventSubject};
use crate::ecs::{Agent, AgentState, EmptyAgent, Resource, ResourceState, Waiting};
use crate::error::{InvariantViolation, SimError};
use crate::map::MapAndOracle;
use crate::matching::{run_batch_match, AssignmentPolicy, Candidate};
use crate::resources::{MapResource, RunConfig, StrategyResource};
use crate::scoreboard::Scoreboard;

/// Schedules `agent`'s next `AgentMove`: finishes whatever road `agent.loc`
/// currently sits on, arriving at `loc.road`'s destination intersection.
/// Used both at spawn (§4.3 "Searching. Entered with ...") and on
/// re-entering Searching after a dropoff.
pub fn schedule_agent_move(world: &mut World, agent_entity: Entity, now: u64) {
    let (road_id, offset, generation) = {
        let agent = world.get::<Agent>(agent_entity).expect("agent entity must exist");
        (agent.loc.road, agent.loc.travel_time_from_start, agent.generation)
    };
    let map = world.resource::<MapResource>().0.clone();
    let Some(road) = map.road(road_id) else {
        return;
    };
    let factor = world.resource::<RunConfig>().speed_reduction_factor;
    let remaining = crate::map::apply_speed_reduction(road.duration_secs, factor).saturating_sub(offset);
    world.resource_mut::<EventQueue>().schedule(
        now + remaining,
        EventKind::AgentMove,
        Some(EventSubject::Agent(agent_entity)),
        generation,
    );
}

fn agent_entity_of(event: &Event) -> Option<Entity> {
    match event.subject {
        Some(EventSubject::Agent(e)) => Some(e),
        _ => None,
    }
}

fn resource_entity_of(event: &Event) -> Option<Entity> {
    match event.subject {
        Some(EventSubject::Resource(e)) => Some(e),
        _ => None,
    }
}

fn handle_agent_move(world: &mut World, event: &Event) -> Result<(), SimError> {
    let Some(agent_entity) = agent_entity_of(event) else {
        return Ok(());
    };
    let Some(agent) = world.get::<Agent>(agent_entity) else {
        return Ok(());
    };
    if agent.generation != event.generation {
        return Ok(()); // stale: cancelled by a later reservation (§4.3)
    }
    let current_road = agent.loc.road;

    let map = world.resource::<MapResource>().0.clone();
    let strategy = world.resource::<StrategyResource>().0.clone();

    let Some(road) = map.road(current_road) else {
        return Ok(());
    };
    let current_intersection = road.to;
    let next_intersection = strategy.next_intersection(agent_entity, current_intersection, map.as_ref());

    let Some(next_road) = map
        .roads_from(current_intersection)
        .iter()
        .find(|r| r.to == next_intersection)
    else {
        return Err(SimError::Strategy(crate::error::StrategyError::NonAdjacentIntersection {
            from: agent.loc,
            returned: next_intersection,
        }));
    };
    let next_road_id = next_road.id;
    let factor = world.resource::<RunConfig>().speed_reduction_factor;
    let next_duration = crate::map::apply_speed_reduction(next_road.duration_secs, factor);

    let mut agent_mut = world.get_mut::<Agent>(agent_entity).unwrap();
    agent_mut.loc = crate::map::LocationOnRoad::start_of(next_road_id);
    let generation = agent_mut.generation;

    world.resource_mut::<EventQueue>().schedule(
        event.time + next_duration,
        EventKind::AgentMove,
        Some(EventSubject::Agent(agent_entity)),
        generation,
    );
    Ok(())
}

fn mark_resource_waiting(world: &mut World, resource_entity: Entity) {
    if let Some(mut resource) = world.get_mut::<Resource>(resource_entity) {
        resource.state = ResourceState::Waiting;
    }
    world.entity_mut(resource_entity).insert(Waiting);
}

fn handle_resource_announce(world: &mut World, event: &Event) -> Result<(), SimError> {
    let Some(resource_entity) = resource_entity_of(event) else {
        return Ok(());
    };
    let batch_frame = world.resource::<RunConfig>().batch_frame;
    let announce_time = event.time;

    let outcome = world.resource_mut::<BatchWindow>().on_arrival(resource_entity, announce_time, batch_frame);
    match outcome {
        crate::batch::ArrivalOutcome::Opened => {
            mark_resource_waiting(world, resource_entity);
            world.resource_mut::<EventQueue>().schedule(
                announce_time + batch_frame,
                EventKind::BatchWindowClose,
                None,
                0,
            );
        }
        crate::batch::ArrivalOutcome::Added => {
            mark_resource_waiting(world, resource_entity);
        }
        crate::batch::ArrivalOutcome::Closed { closed } => {
            let horizon = world.resource::<BatchWindow>().horizon(batch_frame).unwrap();
            let unmatched = close_batch_window(world, closed, horizon)?;
            world.resource_mut::<BatchWindow>().reopen(unmatched, resource_entity, announce_time);
            mark_resource_waiting(world, resource_entity);
            world.resource_mut::<EventQueue>().schedule(
                announce_time + batch_frame,
                EventKind::BatchWindowClose,
                None,
                0,
            );
        }
    }
    Ok(())
}

fn handle_batch_window_close(world: &mut World, event: &Event) -> Result<(), SimError> {
    let batch_frame = world.resource::<RunConfig>().batch_frame;
    let is_current = {
        let window = world.resource::<BatchWindow>();
        window.horizon(batch_frame) == Some(event.time)
    };
    if !is_current {
        return Ok(()); // stale: window already closed by an intervening arrival (§4.4 expansion)
    }
    let closed = world.resource_mut::<BatchWindow>().close();
    let unmatched = close_batch_window(world, closed, event.time)?;
    let reopened = world.resource_mut::<BatchWindow>().reopen_stragglers(unmatched, event.time);
    if reopened {
        // Nothing else will ever re-examine these stragglers: arrivals only
        // trigger a close when something new shows up, so a window with
        // leftovers and no further arrivals needs its own periodic
        // `BatchWindowClose` to keep giving them a chance as agents free up.
        world.resource_mut::<EventQueue>().schedule(event.time + batch_frame, EventKind::BatchWindowClose, None, 0);
    }
    Ok(())
}

fn handle_resource_expire(world: &mut World, event: &Event) -> Result<(), SimError> {
    let Some(resource_entity) = resource_entity_of(event) else {
        return Ok(());
    };
    let Some(mut resource) = world.get_mut::<Resource>(resource_entity) else {
        return Ok(());
    };
    if resource.state != ResourceState::Waiting {
        return Ok(());
    }
    resource.state = ResourceState::Expired;
    world.resource_mut::<Scoreboard>().expired_resources += 1;
    world.despawn(resource_entity);
    Ok(())
}

fn handle_agent_arrive_at_resource(world: &mut World, event: &Event) -> Result<(), SimError> {
    let Some(agent_entity) = agent_entity_of(event) else {
        return Ok(());
    };
    let Some(agent) = world.get::<Agent>(agent_entity) else {
        return Ok(());
    };
    if agent.generation != event.generation {
        return Ok(());
    }
    let Some(resource_entity) = agent.assigned_resource else {
        return Err(SimError::Invariant(InvariantViolation::UnknownTransition {
            entity_kind: "agent",
            entity_id: agent.id,
            detail: "arrived at pickup with no assigned resource".to_string(),
        }));
    };
    let approach_time = event.time.saturating_sub(agent.search_start_time);

    let (resource_announce_time, trip_duration) = {
        let resource = world.get::<Resource>(resource_entity).ok_or_else(|| {
            SimError::Invariant(InvariantViolation::UnknownTransition {
                entity_kind: "resource",
                entity_id: 0,
                detail: "assigned resource entity missing at pickup".to_string(),
            })
        })?;
        (resource.announce_time, resource.trip_duration)
    };

    {
        let mut scoreboard = world.resource_mut::<Scoreboard>();
        scoreboard.total_agent_approach_time += approach_time;
        scoreboard.total_resource_wait_time += event.time.saturating_sub(resource_announce_time);
        scoreboard.total_resource_trip_time += trip_duration;
    }

    let mut agent_mut = world.get_mut::<Agent>(agent_entity).unwrap();
    agent_mut.state = AgentState::Occupied;
    agent_mut.search_start_time = event.time;
    agent_mut.generation += 1;
    let generation = agent_mut.generation;

    world.resource_mut::<EventQueue>().schedule(
        event.time + trip_duration,
        EventKind::AgentArriveAtDropoff,
        Some(EventSubject::Agent(agent_entity)),
        generation,
    );
    Ok(())
}

fn handle_agent_arrive_at_dropoff(world: &mut World, event: &Event) -> Result<(), SimError> {
    let Some(agent_entity) = agent_entity_of(event) else {
        return Ok(());
    };
    let Some(agent) = world.get::<Agent>(agent_entity) else {
        return Ok(());
    };
    if agent.generation != event.generation {
        return Ok(());
    }
    let Some(resource_entity) = agent.assigned_resource else {
        return Err(SimError::Invariant(InvariantViolation::UnknownTransition {
            entity_kind: "agent",
            entity_id: agent.id,
            detail: "arrived at dropoff with no assigned resource".to_string(),
        }));
    };
    let dropoff_loc = world
        .get::<Resource>(resource_entity)
        .map(|r| r.dropoff_loc)
        .ok_or_else(|| {
            SimError::Invariant(InvariantViolation::UnknownTransition {
                entity_kind: "resource",
                entity_id: 0,
                detail: "assigned resource entity missing at dropoff".to_string(),
            })
        })?;
    world.despawn(resource_entity);

    let mut agent_mut = world.get_mut::<Agent>(agent_entity).unwrap();
    agent_mut.loc = dropoff_loc;
    agent_mut.state = AgentState::Searching;
    agent_mut.search_start_time = event.time;
    agent_mut.assigned_resource = None;
    agent_mut.generation += 1;
    world.entity_mut(agent_entity).insert(EmptyAgent);

    schedule_agent_move(world, agent_entity, event.time);
    Ok(())
}

/// §4.4 steps 3a-3c: prune resources that will expire before/at `horizon`,
/// build the cost matrix over whatever remains, run the configured
/// matcher, and apply the results. Returns the resources the matcher left
/// unmatched, for the caller to carry into the next window.
fn close_batch_window(world: &mut World, batch: Vec<Entity>, horizon: u64) -> Result<Vec<Entity>, SimError> {
    let mut remaining = Vec::with_capacity(batch.len());
    for resource_entity in batch {
        let expiration_time = world.get::<Resource>(resource_entity).map(|r| r.expiration_time);
        match expiration_time {
            Some(t) if t <= horizon => {
                world.resource_mut::<EventQueue>().schedule(
                    t,
                    EventKind::ResourceExpire,
                    Some(EventSubject::Resource(resource_entity)),
                    0,
                );
            }
            Some(_) => remaining.push(resource_entity),
            None => {} // despawned already; nothing to do
        }
    }

    world.resource_mut::<Scoreboard>().pool_count += 1;

    if remaining.is_empty() {
        return Ok(Vec::new());
    }

    let map = world.resource::<MapResource>().0.clone();
    let run_config = *world.resource::<RunConfig>();
    let policy = run_config.assignment_policy;
    let speed_factor = run_config.speed_reduction_factor;
    let now = world.resource::<EventQueue>().now();

    let empty_agents: Vec<Entity> = {
        let mut query = world.query_filtered::<Entity, bevy_ecs::prelude::With<EmptyAgent>>();
        query.iter(world).collect()
    };

    // §4.5: filter out candidates whose pickup would arrive after the
    // resource's expiration. Optional in principle, but skipping it would
    // let a resource that can never be reached in time sit on an agent
    // forever instead of expiring and freeing that agent for someone
    // reachable.
    //
    // A resource with an empty candidate row is excluded from the matcher
    // entirely (carried straight over) rather than handed to it: the dense
    // matrix's columns are the union of every *other* resource's feasible
    // agents, so an all-infeasible row still has sentinel cells to put a
    // weight in, and the Hungarian matcher's row<=col perfect-matching
    // requirement would force exactly such a cell to be "selected" —
    // tripping `SentinelSelected` on perfectly ordinary carry-over input
    // instead of treating it as unmatched the way the greedy matcher does.
    let mut carry_over: Vec<Entity> = Vec::new();
    let mut matchable: Vec<Entity> = Vec::with_capacity(remaining.len());
    let mut fares = Vec::with_capacity(remaining.len());
    let mut candidates: Vec<Vec<Candidate>> = Vec::with_capacity(remaining.len());
    for &resource_entity in &remaining {
        let resource = world.get::<Resource>(resource_entity).expect("resource still alive");
        let fare = resource.fare;
        let pickup_loc = resource.pickup_loc;
        let remaining_lifetime = resource.remaining_lifetime(now);
        let mut row = Vec::with_capacity(empty_agents.len());
        for &agent_entity in &empty_agents {
            let agent = world.get::<Agent>(agent_entity).expect("empty agent must exist");
            let raw_pickup_time = map.travel_time(agent.loc, pickup_loc);
            let pickup_time = if raw_pickup_time == u64::MAX {
                u64::MAX
            } else {
                crate::map::apply_speed_reduction(raw_pickup_time, speed_factor)
            };
            if pickup_time != u64::MAX && pickup_time <= remaining_lifetime {
                row.push(Candidate { agent: agent_entity, pickup_time });
            }
        }
        if row.is_empty() {
            carry_over.push(resource_entity);
        } else {
            matchable.push(resource_entity);
            fares.push(fare);
            candidates.push(row);
        }
    }

    let matches = run_batch_match(&matchable, &fares, &candidates, policy)?;

    let mut matched_set = std::collections::HashSet::with_capacity(matches.len());
    for m in &matches {
        matched_set.insert(m.resource);
        apply_match(world, m.resource, m.agent, m.pickup_time, m.weight, policy)?;
    }

    carry_over.extend(matchable.into_iter().filter(|r| !matched_set.contains(r)));
    Ok(carry_over)
}

fn apply_match(
    world: &mut World,
    resource_entity: Entity,
    agent_entity: Entity,
    pickup_time: u64,
    weight: f64,
    policy: AssignmentPolicy,
) -> Result<(), SimError> {
    let now = world.resource::<EventQueue>().now();

    let fare = {
        let mut resource = world.get_mut::<Resource>(resource_entity).ok_or_else(|| {
            SimError::Invariant(InvariantViolation::UnknownTransition {
                entity_kind: "resource",
                entity_id: 0,
                detail: "matched resource entity missing".to_string(),
            })
        })?;
        resource.state = ResourceState::Assigned;
        resource.fare
    };
    world.entity_mut(resource_entity).remove::<Waiting>();

    let search_time = {
        let mut agent = world.get_mut::<Agent>(agent_entity).ok_or_else(|| {
            SimError::Invariant(InvariantViolation::UnknownTransition {
                entity_kind: "agent",
                entity_id: 0,
                detail: "matched agent entity missing".to_string(),
            })
        })?;
        let search_time = now.saturating_sub(agent.search_start_time);
        agent.state = AgentState::Approaching;
        agent.search_start_time = now;
        agent.assigned_resource = Some(resource_entity);
        agent.generation += 1;
        search_time
    };
    world.entity_mut(agent_entity).remove::<EmptyAgent>();

    let generation = world.get::<Agent>(agent_entity).unwrap().generation;
    world.resource_mut::<EventQueue>().schedule(
        now + pickup_time,
        EventKind::AgentArriveAtResource,
        Some(EventSubject::Agent(agent_entity)),
        generation,
    );

    let mut scoreboard = world.resource_mut::<Scoreboard>();
    scoreboard.total_fare += fare;
    scoreboard.total_agent_search_time += search_time;
    if policy == AssignmentPolicy::Optimum {
        scoreboard.total_benefit_factor += weight;
    }
    Ok(())
}

/// Runs one simulation step: pops the next event and routes it to its
/// handler. Returns `Ok(false)` if the queue is empty or the next event is
/// at or past `RunConfig::simulation_end_time`.
pub fn run_next_event(world: &mut World) -> Result<bool, SimError> {
    let end_time = world.get_resource::<RunConfig>().map(|c| c.simulation_end_time);
    let next_time = world.resource::<EventQueue>().peek_time();
    if let (Some(end), Some(next)) = (end_time, next_time) {
        if next >= end {
            return Ok(false);
        }
    }

    let Some(event) = world.resource_mut::<EventQueue>().pop_next() else {
        return Ok(false);
    };
    trace!("dispatch {:?} at t={}", event.kind, event.time);

    match event.kind {
        EventKind::AgentMove => handle_agent_move(world, &event)?,
        EventKind::ResourceAnnounce => handle_resource_announce(world, &event)?,
        EventKind::ResourceExpire => handle_resource_expire(world, &event)?,
        EventKind::AgentArriveAtResource => handle_agent_arrive_at_resource(world, &event)?,
        EventKind::AgentArriveAtDropoff => handle_agent_arrive_at_dropoff(world, &event)?,
        EventKind::BatchWindowClose => handle_batch_window_close(world, &event)?,
    }
    Ok(true)
}

/// Runs steps until the queue empties, the end time is reached, or
/// `max_steps` is hit. Returns the number of steps executed.
pub fn run_until_empty(world: &mut World, max_steps: usize) -> Result<usize, SimError> {
    let mut steps = 0;
    while steps < max_steps {
        if !run_next_event(world)? {
            break;
        }
        steps += 1;
    }
    info!("simulation halted after {steps} steps");
    reap_end_of_run(world);
    Ok(steps)
}

/// §4.4 "At simulation end, all resources still in the current window are
/// counted as expired." Also accounts still-Searching agents' contribution
/// to `totalAgentSearchTime` per §4.8.
fn reap_end_of_run(world: &mut World) {
    let end_time = world.get_resource::<RunConfig>().map(|c| c.simulation_end_time).unwrap_or_default();
    let stragglers = world.resource_mut::<BatchWindow>().close();
    for resource_entity in stragglers {
        if let Some(mut resource) = world.get_mut::<Resource>(resource_entity) {
            if resource.state == ResourceState::Waiting {
                resource.state = ResourceState::Expired;
                world.resource_mut::<Scoreboard>().expired_resources += 1;
            }
        }
    }

    let still_searching: Vec<(Entity, u64)> = {
        let mut query = world.query_filtered::<(Entity, &Agent), bevy_ecs::prelude::With<EmptyAgent>>();
        query
            .iter(world)
            .filter(|(_, a)| a.state == AgentState::Searching)
            .map(|(e, a)| (e, a.search_start_time))
            .collect()
    };
    let contrib: u64 = still_searching
        .iter()
        .map(|(_, start)| end_time.saturating_sub(*start))
        .sum();
    let mut scoreboard = world.resource_mut::<Scoreboard>();
    scoreboard.still_searching_contrib = contrib;
    scoreboard.still_searching_count = still_searching.len() as u64;
}
