use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::{
    config::SimulationConfig,
    rng::{RngManager, SystemRng},
    snapshot::SnapshotWriter,
    systems::{BookkeepingSystem, ColonizationSystem, CultureSpawnSystem, DemographySystem},
    world::{World, WorldSnapshot},
};

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub snapshot_interval_ticks: u64,
    pub snapshot_dir: PathBuf,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    /// Binds the systems enabled in `config.systems`, in turn order:
    /// demography, colonization, culture spawning, bookkeeping.
    pub fn from_config(settings: EngineSettings, config: &SimulationConfig) -> Self {
        let mut builder = Self::new(settings);
        let toggles = &config.systems;
        if toggles.demography {
            builder.push_system(DemographySystem::new());
        }
        if toggles.colonization {
            builder.push_system(ColonizationSystem::new());
        }
        if toggles.culture_spawning {
            builder.push_system(CultureSpawnSystem::new());
        }
        builder.push_system(BookkeepingSystem::new());
        builder
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn push_system(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            snapshot_writer: SnapshotWriter::new(
                &self.settings.snapshot_dir,
                self.settings.snapshot_interval_ticks,
            ),
            settings: self.settings,
        }
    }
}

pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
}

impl Engine {
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|system| system.name()).collect()
    }

    pub fn run(&mut self, world: &mut World, config: &SimulationConfig, turns: u64) -> Result<()> {
        self.run_with_hook(world, config, turns, |_| {})
    }

    /// Runs `turns` turns, handing `hook` a snapshot after each one. Systems
    /// see a sanitized copy of `config`.
    pub fn run_with_hook<F>(
        &mut self,
        world: &mut World,
        config: &SimulationConfig,
        turns: u64,
        mut hook: F,
    ) -> Result<()>
    where
        F: FnMut(WorldSnapshot),
    {
        let mut config = config.clone();
        for warning in config.sanitize() {
            warn!(scenario = %self.settings.scenario_name, %warning, "config value replaced");
        }
        let config = &config;
        info!(
            scenario = %self.settings.scenario_name,
            turns,
            systems = ?self.system_names(),
            "starting run"
        );
        for _ in 0..turns {
            world.stats_mut().reset();
            let ctx = SystemContext {
                turn: world.turn() + 1,
                dt_years: world.dt_years(),
                config,
                scenario_name: &self.settings.scenario_name,
            };
            for system in &mut self.systems {
                let mut rng_stream = self.rng.stream(system.name());
                system.run(&ctx, world, &mut rng_stream)?;
            }
            world.advance_time();
            debug!(turn = world.turn(), stats = ?world.stats(), "turn complete");
            self.snapshot_writer
                .maybe_write(world, &self.settings.scenario_name)?;
            hook(world.snapshot(&self.settings.scenario_name));
        }
        Ok(())
    }
}

pub struct SystemContext<'a> {
    /// 1-based number of the turn being simulated.
    pub turn: u64,
    pub dt_years: f64,
    pub config: &'a SimulationConfig,
    pub scenario_name: &'a str,
}

/// A per-turn step. `Send` so an engine can run on a blocking task.
pub trait System: Send {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;
}
