//! # Ride-Hailing Dispatch Simulation Core
//!
//! A discrete-event simulation kernel for a crowdsourced ride-hailing
//! fleet: agents cruise a road network, resources (ride requests) arrive
//! over time with a fare and a lifetime, and a batched dispatcher matches
//! them at fixed-length assignment epochs using one of two policies — a
//! greedy earliest-pickup matcher or a globally-optimal minimum-cost
//! (Hungarian) matcher.
//!
//! ## Key concepts
//!
//! - **Discrete events.** All progress happens through a single min-heap
//!   event queue (`clock`), ties broken in insertion order.
//! - **ECS world.** Agents and resources are `bevy_ecs` entities; the
//!   `World` owns all mutable state (`ecs`).
//! - **Batched dispatch.** Resources accumulate in a rolling window
//!   (`batch`) and are matched in bulk (`matching`) rather than one at a
//!   time.
//! - **Consumed interfaces.** The road network/travel-time oracle (`map`)
//!   and the agent search strategy (`strategy`) are traits; this crate
//!   ships reference implementations good enough to run standalone.
//! - **Deterministic.** Seeded RNG and FIFO tie-breaking make two runs with
//!   identical inputs produce bit-identical reports.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sim_core::configure::{build_scenario, ScenarioParams};
//! use sim_core::dispatcher::run_until_empty;
//! use sim_core::feed::{CsvResourceFeed, ResourceFeed};
//! use sim_core::map::{InMemoryMap, Intersection, Road};
//! use sim_core::matching::AssignmentPolicy;
//! use sim_core::strategy::RandomWalkStrategy;
//! use bevy_ecs::prelude::World;
//!
//! let intersections = vec![
//!     Intersection { id: 0, lat: 0.0, lon: 0.0 },
//!     Intersection { id: 1, lat: 0.0, lon: 1.0 },
//! ];
//! let roads = vec![Road { id: 0, from: 0, to: 1, duration_secs: 60 }];
//! let map: Arc<dyn sim_core::map::MapAndOracle> = Arc::new(InMemoryMap::new(intersections, roads));
//! let strategy = Arc::new(RandomWalkStrategy::new(42));
//! let feed = CsvResourceFeed::from_reader(
//!     "announce_time,pickup_road,pickup_offset,dropoff_road,dropoff_offset,fare\n0,0,0,0,30,10.0\n".as_bytes(),
//! ).unwrap();
//!
//! let mut world = World::new();
//! let params = ScenarioParams {
//!     number_of_agents: 1,
//!     resource_maximum_lifetime: 600,
//!     assignment_period: 30,
//!     assignment_algorithm: AssignmentPolicy::Fair,
//!     agent_placement_seed: 7,
//!     speed_reduction_factor: 1.0,
//! };
//! build_scenario(&mut world, map, strategy, &feed, params).unwrap();
//! run_until_empty(&mut world, 1_000_000).unwrap();
//! ```

pub mod batch;
pub mod clock;
pub mod configure;
pub mod dispatcher;
pub mod ecs;
pub mod error;
pub mod feed;
pub mod map;
pub mod matching;
pub mod resources;
pub mod scoreboard;
pub mod strategy;
