//! ECS resources wiring the consumed interfaces (§6) and run configuration
//! into the `World`: a trait object wrapped in a `#[derive(Resource)]`
//! newtype per seam, so the map/oracle and search-strategy implementations
//! this kernel consumes can be swapped without touching the dispatcher.

use std::sync::Arc;

use bevy_ecs::prelude::Resource;

use crate::map::MapAndOracle;
use crate::matching::AssignmentPolicy;
use crate::strategy::SearchStrategy;

/// The consumed Map & Oracle interface (C1, §6), shared read-only.
#[derive(Resource, Clone)]
pub struct MapResource(pub Arc<dyn MapAndOracle>);

/// The consumed Search Strategy interface (§6), shared read-only.
#[derive(Resource, Clone)]
pub struct StrategyResource(pub Arc<dyn SearchStrategy>);

/// Run-wide parameters fixed at configure time (§6 configuration surface,
/// minus the CLI/TOML plumbing which lives in `sim_cli`).
#[derive(Resource, Clone, Copy, Debug)]
pub struct RunConfig {
    pub batch_frame: u64,
    pub assignment_policy: AssignmentPolicy,
    /// Set during configure to the last resource's `expiration_time`;
    /// dispatch stops once the next event's time reaches this (§4.2).
    pub simulation_end_time: u64,
    pub number_of_agents: u64,
    /// §6 `speedReductionFactor`: multiplier on vehicle speed in `(0, 1]`,
    /// applied to every road-traversal and oracle travel-time duration via
    /// `map::apply_speed_reduction`. `1.0` (the default) is a no-op.
    pub speed_reduction_factor: f64,
}
