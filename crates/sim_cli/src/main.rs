//! CLI front-end (C14): parses a TOML config file plus override flags,
//! builds the map/oracle/strategy/feed, runs the simulator, and prints the
//! Scoreboard report to stdout. A `clap`-derived struct with a handful of
//! flags, `env_logger::init()` at the top of `main`, and a
//! `Result<(), Box<dyn Error>>` return so `?` propagates cleanly out to
//! process exit.

mod config;

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use bevy_ecs::prelude::World;
use clap::Parser;
use log::info;

use config::RawConfig;
use sim_core::configure::{build_scenario, ScenarioParams};
use sim_core::dispatcher::run_until_empty;
use sim_core::feed::CsvResourceFeed;
use sim_core::map::{load_map_from_toml, MapAndOracle};
use sim_core::scoreboard::StdoutSink;
use sim_core::strategy::RandomWalkStrategy;

/// Ride-hailing dispatch simulator: cruises agents over a road network and
/// batches ride requests to greedy or optimal assignment.
#[derive(Debug, Parser)]
#[command(name = "sim_cli", version, about)]
struct Cli {
    /// Path to the TOML run configuration.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,

    /// Override `numberOfAgents` from the config file.
    #[arg(long = "number-of-agents", value_name = "N")]
    number_of_agents: Option<u64>,

    /// Override `assignmentAlgorithm` (`fair` or `optimum`).
    #[arg(long = "assignment-algorithm", value_name = "ALGO")]
    assignment_algorithm: Option<String>,

    /// Override `assignmentPeriod` (seconds).
    #[arg(long = "assignment-period", value_name = "SECS")]
    assignment_period: Option<u64>,

    /// Override `agentPlacementSeed`.
    #[arg(long = "seed", value_name = "SEED")]
    agent_placement_seed: Option<u64>,

    /// Upper bound on dispatched events, as a runaway-loop backstop.
    #[arg(long, default_value_t = 10_000_000)]
    max_steps: usize,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let raw_toml = fs::read_to_string(&cli.config)
        .map_err(|e| format!("reading config file {:?}: {e}", cli.config))?;
    let mut raw: RawConfig = toml::from_str(&raw_toml)?;

    if cli.number_of_agents.is_some() {
        raw.number_of_agents = cli.number_of_agents;
    }
    if cli.assignment_algorithm.is_some() {
        raw.assignment_algorithm = cli.assignment_algorithm;
    }
    if cli.assignment_period.is_some() {
        raw.assignment_period = cli.assignment_period;
    }
    if cli.agent_placement_seed.is_some() {
        raw.agent_placement_seed = cli.agent_placement_seed;
    }

    let config = raw.validate()?;
    info!(
        "loaded config: {} agents, {} policy, {}s assignment period",
        config.number_of_agents, config.assignment_algorithm, config.assignment_period
    );

    let map_toml = fs::read_to_string(&config.map_path)
        .map_err(|e| format!("reading map file {:?}: {e}", config.map_path))?;
    let map = load_map_from_toml(&map_toml)?;
    let map: Arc<dyn MapAndOracle> = Arc::new(map);

    let dataset_file = fs::File::open(&config.dataset_path)
        .map_err(|e| format!("opening dataset file {:?}: {e}", config.dataset_path))?;
    let feed = CsvResourceFeed::from_reader(dataset_file)?;

    let strategy = Arc::new(RandomWalkStrategy::new(config.agent_placement_seed));

    let params = ScenarioParams {
        number_of_agents: config.number_of_agents,
        resource_maximum_lifetime: config.resource_maximum_life_time,
        assignment_period: config.assignment_period,
        assignment_algorithm: config.assignment_algorithm,
        agent_placement_seed: config.agent_placement_seed,
        speed_reduction_factor: config.speed_reduction_factor,
    };

    let mut world = World::new();
    build_scenario(&mut world, map, strategy, &feed, params)?;

    let steps = run_until_empty(&mut world, cli.max_steps)?;
    info!("ran {steps} events");

    let report = {
        let scoreboard = world.resource::<sim_core::scoreboard::Scoreboard>();
        scoreboard.report(config.number_of_agents)
    };
    let mut sink = StdoutSink;
    report.write_to(&mut sink);

    Ok(())
}
