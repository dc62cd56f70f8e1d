//! Crate-wide error type.
//!
//! No error is recovered inside the core loop. Resource expiration is a
//! normal outcome, not an error; `SimError` is reserved for the four fatal
//! kinds the simulator can encounter.

use thiserror::Error;

use crate::map::{IntersectionId, LocationOnRoad};

/// Fatal errors the simulator can surface. `ConfigError` and `DataError` are
/// expected to occur on malformed input; `InvariantViolation` and
/// `StrategyError` indicate a bug in the kernel or in a consumed
/// implementation and should be treated as such.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid or missing configuration; fatal before the run starts.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Unparseable dataset row or malformed map input; fatal during configure.
    #[error("data error: {0}")]
    Data(#[from] DataError),

    /// Internal invariant broken: event popped out of time order, duplicate
    /// assignment of a reserved agent, sentinel cell selected by the optimal
    /// matcher, unknown state transition.
    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    /// The search strategy returned a non-adjacent intersection or failed.
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required config key `{0}`")]
    MissingKey(&'static str),
    #[error("unrecognized config key `{0}`")]
    UnknownKey(String),
    #[error("config key `{key}` must be positive, got {value}")]
    NotPositive { key: &'static str, value: f64 },
    #[error("assignmentAlgorithm must be `fair` or `optimum`, got `{0}`")]
    UnknownAlgorithm(String),
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("dataset row {row}: {reason}")]
    UnparseableRow { row: usize, reason: String },
    #[error("dataset row {row}: announce_time {this} is before previous row's {previous}")]
    NonMonotoneAnnounceTime { row: usize, this: u64, previous: u64 },
    #[error("dataset row {row}: fare {fare} must be positive")]
    NonPositiveFare { row: usize, fare: f64 },
    #[error("dataset row {row}: location is not on the map")]
    LocationOffMap { row: usize },
    #[error("map file is malformed: {0}")]
    MapParseError(String),
}

#[derive(Debug, Error)]
pub enum InvariantViolation {
    #[error("event popped out of time order: popped time {popped} < current sim time {current}")]
    EventOutOfOrder { popped: u64, current: u64 },
    #[error("agent {agent_id} reserved twice for the same dispatch epoch")]
    DuplicateReservation { agent_id: u64 },
    #[error("optimal matcher selected an infeasible (sentinel) cell at row {row}, col {col}")]
    SentinelSelected { row: usize, col: usize },
    #[error("unknown state transition for {entity_kind} {entity_id}: {detail}")]
    UnknownTransition {
        entity_kind: &'static str,
        entity_id: u64,
        detail: String,
    },
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error(
        "search strategy returned intersection {returned:?} which is not reachable from {from:?} via any road out of the agent's current position"
    )]
    NonAdjacentIntersection {
        from: LocationOnRoad,
        returned: IntersectionId,
    },
    #[error("search strategy failed: {0}")]
    Failed(String),
}
