//! TOML configuration (§6 "Configuration (surface)"): deserializes the
//! recognized keys, rejects unknown ones, and validates into the fatal
//! `ConfigError` variants before anything else runs.

use serde::Deserialize;
use sim_core::error::ConfigError;
use sim_core::matching::AssignmentPolicy;

/// Raw TOML shape. Every field is optional here so missing-vs-invalid can
/// be told apart; `Config::validate` turns this into a `Config`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawConfig {
    pub number_of_agents: Option<u64>,
    pub resource_maximum_life_time: Option<u64>,
    pub assignment_period: Option<u64>,
    pub assignment_algorithm: Option<String>,
    pub dataset_path: Option<String>,
    pub map_path: Option<String>,
    pub bounding_polygon_path: Option<String>,
    pub agent_placement_seed: Option<u64>,
    pub speed_reduction_factor: Option<f64>,
}

/// Validated configuration, ready to build a scenario from.
#[derive(Debug, Clone)]
pub struct Config {
    pub number_of_agents: u64,
    pub resource_maximum_life_time: u64,
    pub assignment_period: u64,
    pub assignment_algorithm: AssignmentPolicy,
    pub dataset_path: String,
    pub map_path: String,
    /// Accepted for interface completeness (§6); the bundled map
    /// builder only reads a flat intersection/road TOML file and never a
    /// real bounding polygon, so this is carried but unused.
    pub bounding_polygon_path: Option<String>,
    pub agent_placement_seed: u64,
    pub speed_reduction_factor: f64,
}

impl RawConfig {
    pub fn validate(self) -> Result<Config, ConfigError> {
        let number_of_agents = self.number_of_agents.ok_or(ConfigError::MissingKey("numberOfAgents"))?;
        if number_of_agents == 0 {
            return Err(ConfigError::NotPositive { key: "numberOfAgents", value: 0.0 });
        }

        let resource_maximum_life_time = self
            .resource_maximum_life_time
            .ok_or(ConfigError::MissingKey("resourceMaximumLifeTime"))?;
        if resource_maximum_life_time == 0 {
            return Err(ConfigError::NotPositive {
                key: "resourceMaximumLifeTime",
                value: 0.0,
            });
        }

        let assignment_period = self.assignment_period.ok_or(ConfigError::MissingKey("assignmentPeriod"))?;
        if assignment_period == 0 {
            return Err(ConfigError::NotPositive { key: "assignmentPeriod", value: 0.0 });
        }

        let assignment_algorithm = self
            .assignment_algorithm
            .ok_or(ConfigError::MissingKey("assignmentAlgorithm"))?
            .parse::<AssignmentPolicy>()?;

        let dataset_path = self.dataset_path.ok_or(ConfigError::MissingKey("datasetPath"))?;
        let map_path = self.map_path.ok_or(ConfigError::MissingKey("mapPath"))?;
        let agent_placement_seed = self.agent_placement_seed.ok_or(ConfigError::MissingKey("agentPlacementSeed"))?;

        let speed_reduction_factor = self.speed_reduction_factor.unwrap_or(1.0);
        if speed_reduction_factor <= 0.0 || speed_reduction_factor > 1.0 {
            return Err(ConfigError::NotPositive {
                key: "speedReductionFactor",
                value: speed_reduction_factor,
            });
        }

        Ok(Config {
            number_of_agents,
            resource_maximum_life_time,
            assignment_period,
            assignment_algorithm,
            dataset_path,
            map_path,
            bounding_polygon_path: self.bounding_polygon_path,
            agent_placement_seed,
            speed_reduction_factor,
        })
    }
}
