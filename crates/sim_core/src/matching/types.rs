use bevy_ecs::prelude::Entity;

/// One (resource, agent) candidate pair produced by the cost-matrix builder
/// (C7): an empty agent within reach of a waiting resource's pickup.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub agent: Entity,
    pub pickup_time: u64,
}

/// A successful (resource, agent) assignment returned by a matcher.
///
/// `pickup_time` is always the real agent-to-pickup travel time, used to
/// schedule `AgentArriveAtResource`. `weight` is whatever the configured
/// policy optimized over — `pickup_time` itself under Fair, `pickup_time /
/// fare` under Optimum — and is what the Scoreboard's benefit-factor total
/// accumulates. Keeping the two separate means a policy that doesn't
/// optimize pickup time directly never corrupts the event schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub resource: Entity,
    pub agent: Entity,
    pub pickup_time: u64,
    pub weight: f64,
}
