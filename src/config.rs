//! Typed simulation parameters with documented defaults.
//!
//! Every numeric constant the engines use lives here and can be overridden
//! from the `config:` block of a scenario file. Out-of-range values are not
//! fatal: [`SimulationConfig::sanitize`] clamps them and reports a warning.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::components::Biome;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// A value that was out of range and has been replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn default_turns_per_year() -> f64 {
    52.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Turn length is `1 / turns_per_year` years.
    #[serde(default = "default_turns_per_year")]
    pub turns_per_year: f64,
    #[serde(default)]
    pub demography: DemographyConfig,
    #[serde(default)]
    pub colonization: ColonizationConfig,
    #[serde(default)]
    pub culture_spawning: CultureSpawnConfig,
    #[serde(default)]
    pub systems: SystemToggles,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            turns_per_year: default_turns_per_year(),
            demography: DemographyConfig::default(),
            colonization: ColonizationConfig::default(),
            culture_spawning: CultureSpawnConfig::default(),
            systems: SystemToggles::default(),
        }
    }
}

// --- demography -----------------------------------------------------------

fn default_birth_rate() -> f64 {
    0.12
}

fn default_fertile_fraction() -> f64 {
    0.5
}

fn default_attenuation_midpoint() -> f64 {
    0.9
}

fn default_attenuation_steepness() -> f64 {
    12.0
}

fn default_starvation_severity() -> f64 {
    2.0
}

fn default_max_starvation() -> f64 {
    3.0
}

fn default_capacity_per_food() -> f64 {
    100.0
}

fn default_food_output_per_yield() -> f64 {
    120.0
}

fn default_food_consumption() -> f64 {
    1.0
}

fn default_wild_growth_rate() -> f64 {
    0.01
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographyConfig {
    #[serde(default)]
    pub annual_mortality: MortalityRates,
    #[serde(default = "default_birth_rate")]
    pub annual_birth_rate: f64,
    /// Share of the prime band counted as fertile.
    #[serde(default = "default_fertile_fraction")]
    pub fertile_fraction: f64,
    #[serde(default = "default_attenuation_midpoint")]
    pub birth_attenuation_midpoint: f64,
    #[serde(default = "default_attenuation_steepness")]
    pub birth_attenuation_steepness: f64,
    #[serde(default = "default_starvation_severity")]
    pub starvation_severity: f64,
    #[serde(default = "default_max_starvation")]
    pub max_starvation_multiplier: f64,
    /// People sustained per unit of yearly food yield.
    #[serde(default = "default_capacity_per_food")]
    pub carrying_capacity_per_food: f64,
    /// Stockpile gained per unit of food yield per year.
    #[serde(default = "default_food_output_per_yield")]
    pub food_output_per_yield: f64,
    /// Stockpile eaten per person per year.
    #[serde(default = "default_food_consumption")]
    pub food_consumption_per_capita: f64,
    /// Yearly logistic growth of unaffiliated populations on unowned tiles.
    #[serde(default = "default_wild_growth_rate")]
    pub wild_growth_rate: f64,
}

impl Default for DemographyConfig {
    fn default() -> Self {
        Self {
            annual_mortality: MortalityRates::default(),
            annual_birth_rate: default_birth_rate(),
            fertile_fraction: default_fertile_fraction(),
            birth_attenuation_midpoint: default_attenuation_midpoint(),
            birth_attenuation_steepness: default_attenuation_steepness(),
            starvation_severity: default_starvation_severity(),
            max_starvation_multiplier: default_max_starvation(),
            carrying_capacity_per_food: default_capacity_per_food(),
            food_output_per_yield: default_food_output_per_yield(),
            food_consumption_per_capita: default_food_consumption(),
            wild_growth_rate: default_wild_growth_rate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MortalityRates {
    pub children: f64,
    pub youth: f64,
    pub prime: f64,
    pub mature: f64,
    pub elderly: f64,
}

impl Default for MortalityRates {
    fn default() -> Self {
        Self {
            children: 0.020,
            youth: 0.002,
            prime: 0.004,
            mature: 0.010,
            elderly: 0.060,
        }
    }
}

// --- colonization ---------------------------------------------------------

fn default_base_range() -> u32 {
    3
}

fn default_max_range() -> u32 {
    8
}

fn default_decay() -> f64 {
    0.7
}

fn default_pressure_threshold() -> f64 {
    25.0
}

fn default_settler_cost() -> f64 {
    8.0
}

fn default_settler_food_cost() -> f64 {
    10.0
}

fn default_expansion_probability() -> f64 {
    0.15
}

fn default_yield_normalization() -> f64 {
    3.0
}

fn default_min_pressure_factor() -> f64 {
    0.5
}

fn default_max_pressure_factor() -> f64 {
    2.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColonizationConfig {
    /// Reach with no excess population.
    #[serde(default = "default_base_range")]
    pub base_colonization_range: u32,
    /// Reach once population is at twice carrying capacity; never exceeded.
    #[serde(default = "default_max_range")]
    pub max_colonization_range: u32,
    /// Per-hex score multiplier, in (0, 1].
    #[serde(default = "default_decay")]
    pub distance_decay_factor: f64,
    /// Below this total population a civilization never expands.
    #[serde(default = "default_pressure_threshold")]
    pub population_pressure_threshold: f64,
    #[serde(default = "default_settler_cost")]
    pub settler_population_cost: f64,
    #[serde(default = "default_settler_food_cost")]
    pub settler_food_cost: f64,
    #[serde(default = "default_expansion_probability")]
    pub expansion_attempt_probability: f64,
    /// Food plus production yield that maps to a resource value of 1.
    #[serde(default = "default_yield_normalization")]
    pub yield_normalization: f64,
    #[serde(default = "default_min_pressure_factor")]
    pub min_pressure_factor: f64,
    #[serde(default = "default_max_pressure_factor")]
    pub max_pressure_factor: f64,
    #[serde(default)]
    pub terrain_modifiers: TerrainModifiers,
    #[serde(default)]
    pub strategic_bonuses: StrategicBonuses,
}

impl Default for ColonizationConfig {
    fn default() -> Self {
        Self {
            base_colonization_range: default_base_range(),
            max_colonization_range: default_max_range(),
            distance_decay_factor: default_decay(),
            population_pressure_threshold: default_pressure_threshold(),
            settler_population_cost: default_settler_cost(),
            settler_food_cost: default_settler_food_cost(),
            expansion_attempt_probability: default_expansion_probability(),
            yield_normalization: default_yield_normalization(),
            min_pressure_factor: default_min_pressure_factor(),
            max_pressure_factor: default_max_pressure_factor(),
            terrain_modifiers: TerrainModifiers::default(),
            strategic_bonuses: StrategicBonuses::default(),
        }
    }
}

/// Colonization ease per biome; 0 means the biome can never be claimed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainModifiers {
    pub ocean: f64,
    pub coast: f64,
    pub plains: f64,
    pub grassland: f64,
    pub forest: f64,
    pub hills: f64,
    pub tundra: f64,
    pub swamp: f64,
    pub desert: f64,
    pub mountain: f64,
}

impl Default for TerrainModifiers {
    fn default() -> Self {
        Self {
            ocean: 0.0,
            coast: 0.8,
            plains: 1.0,
            grassland: 0.9,
            forest: 0.8,
            hills: 0.7,
            tundra: 0.5,
            swamp: 0.4,
            desert: 0.3,
            mountain: 0.1,
        }
    }
}

impl TerrainModifiers {
    pub fn get(&self, biome: Biome) -> f64 {
        match biome {
            Biome::Ocean => self.ocean,
            Biome::Coast => self.coast,
            Biome::Plains => self.plains,
            Biome::Grassland => self.grassland,
            Biome::Forest => self.forest,
            Biome::Hills => self.hills,
            Biome::Tundra => self.tundra,
            Biome::Swamp => self.swamp,
            Biome::Desert => self.desert,
            Biome::Mountain => self.mountain,
        }
    }

    fn values_mut(&mut self) -> [&mut f64; 10] {
        [
            &mut self.ocean,
            &mut self.coast,
            &mut self.plains,
            &mut self.grassland,
            &mut self.forest,
            &mut self.hills,
            &mut self.tundra,
            &mut self.swamp,
            &mut self.desert,
            &mut self.mountain,
        ]
    }
}

/// Additive score bonus per active strategic flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategicBonuses {
    pub river: f64,
    pub coastal: f64,
    pub fertile: f64,
    pub mountain_pass: f64,
    pub resource_deposit: f64,
}

impl Default for StrategicBonuses {
    fn default() -> Self {
        Self {
            river: 0.3,
            coastal: 0.2,
            fertile: 0.25,
            mountain_pass: 0.15,
            resource_deposit: 0.2,
        }
    }
}

// --- culture spawning -----------------------------------------------------

fn default_spawn_interval() -> u64 {
    100
}

fn default_isolation_threshold() -> u32 {
    5
}

fn default_min_spawn_population() -> f64 {
    15.0
}

fn default_spawn_probability() -> f64 {
    0.15
}

fn default_isolation_cap() -> u32 {
    20
}

fn default_initial_food() -> f64 {
    20.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CultureSpawnConfig {
    #[serde(default = "default_spawn_interval")]
    pub spawn_interval_turns: u64,
    #[serde(default = "default_isolation_threshold")]
    pub isolation_threshold_hexes: u32,
    #[serde(default = "default_min_spawn_population")]
    pub min_spawn_population: f64,
    #[serde(default = "default_spawn_probability")]
    pub base_spawn_probability: f64,
    /// Scale each roll by `score / mean score` of the candidates.
    #[serde(default)]
    pub scale_probability_by_score: bool,
    /// Isolation used in scoring when no tile is owned anywhere.
    #[serde(default = "default_isolation_cap")]
    pub isolation_score_cap: u32,
    #[serde(default = "default_initial_food")]
    pub initial_food_stockpile: f64,
}

impl Default for CultureSpawnConfig {
    fn default() -> Self {
        Self {
            spawn_interval_turns: default_spawn_interval(),
            isolation_threshold_hexes: default_isolation_threshold(),
            min_spawn_population: default_min_spawn_population(),
            base_spawn_probability: default_spawn_probability(),
            scale_probability_by_score: false,
            isolation_score_cap: default_isolation_cap(),
            initial_food_stockpile: default_initial_food(),
        }
    }
}

fn enabled() -> bool {
    true
}

/// Which systems the engine binds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemToggles {
    #[serde(default = "enabled")]
    pub demography: bool,
    #[serde(default = "enabled")]
    pub colonization: bool,
    #[serde(default = "enabled")]
    pub culture_spawning: bool,
}

impl Default for SystemToggles {
    fn default() -> Self {
        Self {
            demography: true,
            colonization: true,
            culture_spawning: true,
        }
    }
}

impl SimulationConfig {
    /// Reads a standalone config file. See [`SimulationConfig::from_yaml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parses and sanitizes a config, logging every replaced value.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yaml::from_str(text)?;
        for warning in config.sanitize() {
            warn!(%warning, "config value replaced");
        }
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Length of one turn in years.
    pub fn dt_years(&self) -> f64 {
        1.0 / self.turns_per_year
    }

    /// Replaces out-of-range values with safe ones and reports each change.
    pub fn sanitize(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if !(self.turns_per_year.is_finite() && self.turns_per_year > 0.0) {
            warnings.push(replaced(
                "turns_per_year",
                self.turns_per_year,
                default_turns_per_year(),
            ));
            self.turns_per_year = default_turns_per_year();
        }

        let d = &mut self.demography;
        let m = &mut d.annual_mortality;
        for (field, rate) in [
            ("annual_mortality.children", &mut m.children),
            ("annual_mortality.youth", &mut m.youth),
            ("annual_mortality.prime", &mut m.prime),
            ("annual_mortality.mature", &mut m.mature),
            ("annual_mortality.elderly", &mut m.elderly),
        ] {
            clamp_unit(field, rate, &mut warnings);
        }
        clamp_unit("fertile_fraction", &mut d.fertile_fraction, &mut warnings);
        for (field, value) in [
            ("annual_birth_rate", &mut d.annual_birth_rate),
            ("birth_attenuation_steepness", &mut d.birth_attenuation_steepness),
            ("starvation_severity", &mut d.starvation_severity),
            ("carrying_capacity_per_food", &mut d.carrying_capacity_per_food),
            ("food_output_per_yield", &mut d.food_output_per_yield),
            ("food_consumption_per_capita", &mut d.food_consumption_per_capita),
            ("wild_growth_rate", &mut d.wild_growth_rate),
        ] {
            clamp_non_negative(field, value, &mut warnings);
        }
        if !(d.max_starvation_multiplier >= 1.0) {
            warnings.push(replaced(
                "max_starvation_multiplier",
                d.max_starvation_multiplier,
                1.0,
            ));
            d.max_starvation_multiplier = 1.0;
        }
        if !(d.birth_attenuation_midpoint > 0.0 && d.birth_attenuation_midpoint.is_finite()) {
            warnings.push(replaced(
                "birth_attenuation_midpoint",
                d.birth_attenuation_midpoint,
                default_attenuation_midpoint(),
            ));
            d.birth_attenuation_midpoint = default_attenuation_midpoint();
        }

        let c = &mut self.colonization;
        if !(c.distance_decay_factor > 0.0 && c.distance_decay_factor <= 1.0) {
            warnings.push(replaced(
                "distance_decay_factor",
                c.distance_decay_factor,
                default_decay(),
            ));
            c.distance_decay_factor = default_decay();
        }
        if c.base_colonization_range > c.max_colonization_range {
            warnings.push(ConfigWarning {
                field: "base_colonization_range",
                message: format!(
                    "{} exceeds max_colonization_range {}, lowered to match",
                    c.base_colonization_range, c.max_colonization_range
                ),
            });
            c.base_colonization_range = c.max_colonization_range;
        }
        clamp_unit(
            "expansion_attempt_probability",
            &mut c.expansion_attempt_probability,
            &mut warnings,
        );
        for (field, value) in [
            ("population_pressure_threshold", &mut c.population_pressure_threshold),
            ("settler_population_cost", &mut c.settler_population_cost),
            ("settler_food_cost", &mut c.settler_food_cost),
            ("min_pressure_factor", &mut c.min_pressure_factor),
        ] {
            clamp_non_negative(field, value, &mut warnings);
        }
        if !(c.yield_normalization > 0.0 && c.yield_normalization.is_finite()) {
            warnings.push(replaced(
                "yield_normalization",
                c.yield_normalization,
                default_yield_normalization(),
            ));
            c.yield_normalization = default_yield_normalization();
        }
        if !(c.max_pressure_factor >= c.min_pressure_factor) {
            warnings.push(replaced(
                "max_pressure_factor",
                c.max_pressure_factor,
                c.min_pressure_factor,
            ));
            c.max_pressure_factor = c.min_pressure_factor;
        }
        for value in c.terrain_modifiers.values_mut() {
            clamp_unit("terrain_modifiers", value, &mut warnings);
        }
        let b = &mut c.strategic_bonuses;
        for value in [
            &mut b.river,
            &mut b.coastal,
            &mut b.fertile,
            &mut b.mountain_pass,
            &mut b.resource_deposit,
        ] {
            clamp_non_negative("strategic_bonuses", value, &mut warnings);
        }

        let s = &mut self.culture_spawning;
        if s.spawn_interval_turns == 0 {
            warnings.push(ConfigWarning {
                field: "spawn_interval_turns",
                message: format!(
                    "0 is not a valid interval, using {}",
                    default_spawn_interval()
                ),
            });
            s.spawn_interval_turns = default_spawn_interval();
        }
        clamp_unit("base_spawn_probability", &mut s.base_spawn_probability, &mut warnings);
        clamp_non_negative("min_spawn_population", &mut s.min_spawn_population, &mut warnings);
        clamp_non_negative("initial_food_stockpile", &mut s.initial_food_stockpile, &mut warnings);
        if s.isolation_score_cap == 0 {
            warnings.push(ConfigWarning {
                field: "isolation_score_cap",
                message: format!(
                    "0 would zero every spawn score, using {}",
                    default_isolation_cap()
                ),
            });
            s.isolation_score_cap = default_isolation_cap();
        }

        warnings
    }
}

fn replaced(field: &'static str, was: f64, now: f64) -> ConfigWarning {
    ConfigWarning {
        field,
        message: format!("{was} is out of range, using {now}"),
    }
}

fn clamp_unit(field: &'static str, value: &mut f64, warnings: &mut Vec<ConfigWarning>) {
    let fixed = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
    if fixed != *value {
        warnings.push(replaced(field, *value, fixed));
        *value = fixed;
    }
}

fn clamp_non_negative(field: &'static str, value: &mut f64, warnings: &mut Vec<ConfigWarning>) {
    let fixed = if value.is_finite() { value.max(0.0) } else { 0.0 };
    if fixed != *value {
        warnings.push(replaced(field, *value, fixed));
        *value = fixed;
    }
}
