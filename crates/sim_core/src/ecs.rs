//! Entity Component System: components and state enums for agents and resources.
//!
//! Agents and resources are `bevy_ecs` entities — integer ids into a `World`
//! that owns all mutable state: an index-based registry where events
//! reference agents/resources by `Entity` instead of holding cyclic Rust
//! references.

use bevy_ecs::prelude::{Component, Entity};

use crate::map::LocationOnRoad;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Searching,
    Approaching,
    Occupied,
}

/// An agent (driver/vehicle). `id` is assigned at spawn time in spawn order,
/// independent of the ECS `Entity` index, so registries can sort by it
/// deterministically regardless of despawn/respawn churn (there is none in
/// this kernel, but the field keeps the invariant explicit rather than
/// implicit in `Entity` ordering).
#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct Agent {
    pub id: u64,
    pub loc: LocationOnRoad,
    pub state: AgentState,
    /// Simulation time this agent entered its current state. Named for its
    /// original purpose — computing cumulative Searching time at
    /// termination (§4.8) — but updated on every transition so approach
    /// duration can be recovered the same way on arrival at pickup.
    pub search_start_time: u64,
    /// Bumped every time the agent leaves `Searching` to cancel its pending
    /// `AgentMove` lazily (§4.3).
    pub generation: u64,
    /// Set while `Approaching`/`Occupied`: the resource currently reserved
    /// or being served.
    pub assigned_resource: Option<Entity>,
}

impl Agent {
    pub fn new(id: u64, loc: LocationOnRoad) -> Self {
        Self {
            id,
            loc,
            state: AgentState::Searching,
            search_start_time: 0,
            generation: 0,
            assigned_resource: None,
        }
    }
}

/// Marker for agents currently in the empty-agents registry (Searching and
/// not yet reserved for a dispatch epoch in flight).
#[derive(Debug, Clone, Copy, Component)]
pub struct EmptyAgent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Announced but not yet added to a batch window.
    Announced,
    /// Inside the current batch window, awaiting a dispatch epoch.
    Waiting,
    Assigned,
    Expired,
}

/// A ride request. `id` is the monotonic sequence number the resource feed
/// assigned it, used for deterministic tie-breaking and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct Resource {
    pub id: u64,
    pub announce_time: u64,
    pub pickup_loc: LocationOnRoad,
    pub dropoff_loc: LocationOnRoad,
    pub trip_duration: u64,
    pub fare: f64,
    pub expiration_time: u64,
    pub state: ResourceState,
}

impl Resource {
    pub fn remaining_lifetime(&self, now: u64) -> u64 {
        self.expiration_time.saturating_sub(now)
    }
}

/// Marker for resources currently sitting in the batch window.
#[derive(Debug, Clone, Copy, Component)]
pub struct Waiting;
