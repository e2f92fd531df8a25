use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use frontier::{
    engine::{EngineBuilder, EngineSettings},
    scenario::{Scenario, ScenarioLoader},
    web::{self, WebServerConfig},
    SimulationConfig,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Hex-grid colonization and demography simulator")]
struct Cli {
    /// Default log filter; RUST_LOG takes precedence when set
    #[arg(long, global = true, default_value = "frontier=info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a scenario to completion and print a summary
    Run(RunArgs),
    /// Run a scenario while serving its frames over HTTP
    Serve {
        #[command(flatten)]
        run: RunArgs,

        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/twin_valleys.yaml")]
    scenario: PathBuf,

    /// Standalone config file replacing the scenario's `config:` block
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override turn count (uses scenario default when omitted)
    #[arg(long)]
    turns: Option<u64>,

    /// Override snapshot interval in turns (0 disables)
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for snapshots
    #[arg(long, default_value = "snapshots")]
    snapshot_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Run(args) => run(args),
        Command::Serve { run, host, port } => {
            let scenario = load_scenario(&run)?;
            let turns = scenario.turns(run.turns);
            let snapshot_interval = run
                .snapshot_interval
                .unwrap_or(scenario.snapshot_interval_ticks);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(web::run(WebServerConfig {
                scenario,
                turns,
                snapshot_interval,
                snapshot_dir: run.snapshot_dir,
                host,
                port,
            }))
        }
    }
}

fn load_scenario(args: &RunArgs) -> Result<Scenario> {
    let mut scenario = ScenarioLoader::new(".").load(&args.scenario)?;
    if let Some(path) = &args.config {
        scenario.config = SimulationConfig::load(path)?;
    }
    Ok(scenario)
}

fn run(args: RunArgs) -> Result<()> {
    let scenario = load_scenario(&args)?;
    let mut world = scenario.build_world()?;
    let turns = scenario.turns(args.turns);
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        snapshot_interval_ticks: args
            .snapshot_interval
            .unwrap_or(scenario.snapshot_interval_ticks),
        snapshot_dir: args.snapshot_dir,
    };

    let mut engine = EngineBuilder::from_config(settings, &scenario.config).build();
    engine.run(&mut world, &scenario.config, turns)?;

    let snapshot = world.snapshot(&scenario.name);
    println!(
        "Scenario '{}' completed {} turns ({:.1} years). \
         Population {}, {} civilizations, {} tiles owned.",
        scenario.name,
        turns,
        snapshot.years_elapsed,
        snapshot.total_population,
        snapshot.civilizations.len(),
        snapshot.owned_tiles,
    );
    for civ in &snapshot.civilizations {
        println!(
            "  {:<16} {:<14} {:>4} tiles  pop {:>7}  food {:>8.1}",
            civ.name, civ.culture, civ.tile_count, civ.population, civ.food
        );
    }
    Ok(())
}
