//! Assignment policy selection (§6 `assignmentAlgorithm ∈ {fair, optimum}`).

use std::fmt;

/// Which weight function the cost-matrix builder uses and which matcher the
/// batching window invokes when a window closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentPolicy {
    /// Policy P1: greedy earliest-pickup. Weight = pickup_time.
    Fair,
    /// Policy P2: globally-optimal minimum-cost matching. Weight =
    /// pickup_time / fare (the "benefit factor").
    Optimum,
}

impl AssignmentPolicy {
    pub fn weight(&self, pickup_time: u64, fare: f64) -> f64 {
        match self {
            AssignmentPolicy::Fair => pickup_time as f64,
            AssignmentPolicy::Optimum => pickup_time as f64 / fare,
        }
    }
}

impl fmt::Display for AssignmentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentPolicy::Fair => write!(f, "fair"),
            AssignmentPolicy::Optimum => write!(f, "optimum"),
        }
    }
}

impl std::str::FromStr for AssignmentPolicy {
    type Err = crate::error::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fair" => Ok(AssignmentPolicy::Fair),
            "optimum" => Ok(AssignmentPolicy::Optimum),
            other => Err(crate::error::ConfigError::UnknownAlgorithm(other.to_string())),
        }
    }
}
