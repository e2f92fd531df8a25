use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::{
    cohort::{CohortState, STABLE_PROFILE},
    components::{Biome, StrategicFlags, Tile},
    config::SimulationConfig,
    hex::HexCoord,
    naming::{dominant_biome, generate_identity, region_seed, LinguisticStyle},
    world::{Founding, World},
};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("map must be at least 1x1, got {width}x{height}")]
    EmptyMap { width: u32, height: u32 },
    #[error("civilization '{name}' has its origin {origin} outside the map")]
    OriginOffMap { name: String, origin: HexCoord },
    #[error("civilization '{name}' starts on {origin}, already owned by another civilization")]
    OriginTaken { name: String, origin: HexCoord },
    #[error("civilization '{name}' starts on impassable terrain at {origin}")]
    OriginImpassable { name: String, origin: HexCoord },
}

fn default_turns_per_run() -> u64 {
    520
}

fn default_snapshot_interval_ticks() -> u64 {
    52
}

fn default_biome() -> Biome {
    Biome::Grassland
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default)]
    pub turns: Option<u64>,
    #[serde(default = "default_snapshot_interval_ticks")]
    pub snapshot_interval_ticks: u64,
    pub map: MapSpec,
    #[serde(default)]
    pub civilizations: Vec<CivSpec>,
    #[serde(default)]
    pub config: SimulationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapSpec {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_biome")]
    pub default_biome: Biome,
    /// Applied in order; later patches overwrite earlier ones.
    #[serde(default)]
    pub patches: Vec<TerrainPatch>,
    #[serde(default)]
    pub wild_population: Vec<PopulationPatch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerrainPatch {
    pub q: i32,
    pub r: i32,
    #[serde(default)]
    pub radius: u32,
    pub biome: Option<Biome>,
    #[serde(default)]
    pub flags: Option<StrategicFlags>,
    pub food: Option<f64>,
    pub production: Option<f64>,
}

/// Unaffiliated people added to every tile of a hex disc.
#[derive(Debug, Clone, Deserialize)]
pub struct PopulationPatch {
    pub q: i32,
    pub r: i32,
    #[serde(default)]
    pub radius: u32,
    pub population: f64,
}

fn default_food_stockpile() -> f64 {
    50.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct CivSpec {
    pub name: String,
    pub culture: Option<String>,
    pub style: Option<LinguisticStyle>,
    pub origin: HexCoord,
    #[serde(default)]
    pub territory_radius: u32,
    pub population: f64,
    #[serde(default = "default_food_stockpile")]
    pub food: f64,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Reads and parses a scenario, then sanitizes its config, logging every
    /// value that had to be replaced.
    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let mut scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        for warning in scenario.config.sanitize() {
            warn!(scenario = %scenario.name, %warning, "config value replaced");
        }
        Ok(scenario)
    }
}

impl Scenario {
    pub fn build_world(&self) -> Result<World, ScenarioError> {
        let map = &self.map;
        if map.width == 0 || map.height == 0 {
            return Err(ScenarioError::EmptyMap {
                width: map.width,
                height: map.height,
            });
        }

        let mut world = World::new(self.config.dt_years());
        for q in 0..map.width as i32 {
            for r in 0..map.height as i32 {
                world.insert_tile(Tile::new(HexCoord::new(q, r), map.default_biome));
            }
        }

        for patch in &map.patches {
            for coord in HexCoord::new(patch.q, patch.r).range(patch.radius) {
                let Some(tile) = world.tile_mut(coord) else {
                    continue;
                };
                if let Some(biome) = patch.biome {
                    let (food, production) = biome.default_yields();
                    tile.biome = biome;
                    tile.food_yield = food;
                    tile.production_yield = production;
                }
                if let Some(flags) = patch.flags {
                    tile.flags = flags;
                }
                if let Some(food) = patch.food {
                    tile.food_yield = food.max(0.0);
                }
                if let Some(production) = patch.production {
                    tile.production_yield = production.max(0.0);
                }
            }
        }

        for patch in &map.wild_population {
            for coord in HexCoord::new(patch.q, patch.r).range(patch.radius) {
                if let Some(tile) = world.tile_mut(coord) {
                    tile.population += patch.population.max(0.0);
                }
            }
        }

        for spec in &self.civilizations {
            self.found(&mut world, spec)?;
        }
        Ok(world)
    }

    fn found(&self, world: &mut World, spec: &CivSpec) -> Result<(), ScenarioError> {
        let origin_tile = world.tile(spec.origin).ok_or_else(|| ScenarioError::OriginOffMap {
            name: spec.name.clone(),
            origin: spec.origin,
        })?;
        if origin_tile.is_owned() {
            return Err(ScenarioError::OriginTaken {
                name: spec.name.clone(),
                origin: spec.origin,
            });
        }
        if self.config.colonization.terrain_modifiers.get(origin_tile.biome) <= 0.0 {
            return Err(ScenarioError::OriginImpassable {
                name: spec.name.clone(),
                origin: spec.origin,
            });
        }

        let territory: Vec<HexCoord> = spec
            .origin
            .range(spec.territory_radius)
            .filter(|coord| {
                world.tile(*coord).is_some_and(|tile| {
                    !tile.is_owned()
                        && self.config.colonization.terrain_modifiers.get(tile.biome) > 0.0
                })
            })
            .collect();
        let composition: Vec<(HexCoord, Biome)> = territory
            .iter()
            .filter_map(|coord| world.tile(*coord))
            .map(|tile| (tile.coord, tile.biome))
            .collect();
        let seed = region_seed(&composition, self.seed ^ world.civs().peek_next_id().raw() as u64);
        let dominant = dominant_biome(composition.iter().map(|(_, biome)| *biome));
        let mut identity = generate_identity(seed, dominant.unwrap_or(Biome::Plains));
        identity.name = spec.name.clone();
        if let Some(culture) = &spec.culture {
            identity.culture_name = culture.clone();
        }
        if let Some(style) = spec.style {
            identity.style = style;
        }

        world.found_civilization(Founding {
            origin: spec.origin,
            territory,
            identity,
            cohorts: CohortState::from_total(spec.population.max(0.0), &STABLE_PROFILE),
            food_stockpile: spec.food,
            founded_turn: 0,
        });
        Ok(())
    }

    pub fn turns(&self, override_turns: Option<u64>) -> u64 {
        override_turns.or(self.turns).unwrap_or_else(default_turns_per_run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"
name: small
seed: 3
map:
  width: 6
  height: 4
  default_biome: plains
  patches:
    - { q: 5, r: 0, radius: 1, biome: ocean }
    - { q: 1, r: 1, biome: hills, flags: { river: true }, food: 4.0 }
  wild_population:
    - { q: 4, r: 3, population: 12.5 }
civilizations:
  - name: Vellin
    origin: { q: 1, r: 1 }
    territory_radius: 1
    population: 200
"#;

    #[test]
    fn builds_map_patches_and_civs() {
        let scenario: Scenario = serde_yaml::from_str(SMALL).unwrap();
        let world = scenario.build_world().unwrap();

        assert_eq!(world.tiles().len(), 24);
        assert_eq!(world.tile(HexCoord::new(5, 0)).unwrap().biome, Biome::Ocean);
        let hills = world.tile(HexCoord::new(1, 1)).unwrap();
        assert_eq!(hills.biome, Biome::Hills);
        assert_eq!(hills.food_yield, 4.0);
        assert_eq!(hills.production_yield, 2.0);
        assert!(hills.flags.river);
        assert_eq!(world.tile(HexCoord::new(4, 3)).unwrap().population, 12.5);

        let civ = world.civs().iter().next().unwrap();
        assert_eq!(civ.name, "Vellin");
        assert_eq!(civ.tiles.len(), 7);
        assert!((civ.population() - 200.0).abs() < 1e-9);
        assert_eq!(civ.food_stockpile, 50.0);
        assert_eq!(scenario.turns(None), 520);
        assert_eq!(scenario.turns(Some(10)), 10);
    }

    #[test]
    fn origin_off_map_is_an_error() {
        let text = SMALL.replace("origin: { q: 1, r: 1 }", "origin: { q: 40, r: 1 }");
        let scenario: Scenario = serde_yaml::from_str(&text).unwrap();
        assert!(matches!(
            scenario.build_world(),
            Err(ScenarioError::OriginOffMap { .. })
        ));
    }

    #[test]
    fn origin_on_ocean_is_an_error() {
        let text = SMALL.replace("origin: { q: 1, r: 1 }", "origin: { q: 5, r: 0 }");
        let scenario: Scenario = serde_yaml::from_str(&text).unwrap();
        assert!(matches!(
            scenario.build_world(),
            Err(ScenarioError::OriginImpassable { .. })
        ));
    }
}
