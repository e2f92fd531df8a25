//! Territorial expansion of existing civilizations.
//!
//! Every civilization is planned against the ownership map as it stood at
//! the start of the phase. Claims are then applied one civilization at a
//! time in ascending id order; a target taken earlier in the same phase is
//! reported as [`ExpansionOutcome::TargetClaimed`].

use std::collections::BTreeMap;

use anyhow::Result;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::{
    cohort::{capacity_load, AgeBand, STABLE_PROFILE},
    components::{Biome, CivId, Civilization, StrategicFlags, Tile},
    config::{ColonizationConfig, SimulationConfig, StrategicBonuses},
    engine::{System, SystemContext},
    hex::HexCoord,
    rng::SystemRng,
    world::{territory_capacity, TileMap, TurnStats, World},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExpansionCandidate {
    pub target: HexCoord,
    /// Hex distance to the nearest owned tile.
    pub distance: u32,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExpansionOutcome {
    Claimed {
        target: HexCoord,
        distance: u32,
        score: f64,
        /// People moved out of the prime band onto the new tile.
        settlers: f64,
    },
    BelowThreshold,
    RollFailed,
    NoCandidates,
    InsufficientFood,
    TargetClaimed {
        target: HexCoord,
    },
}

impl ExpansionOutcome {
    /// Civilizations held back by the population gate are counted in
    /// `below_threshold` only; every other outcome is an attempt.
    fn record(&self, stats: &mut TurnStats) {
        if !matches!(self, ExpansionOutcome::BelowThreshold) {
            stats.expansion_attempts += 1;
        }
        match self {
            ExpansionOutcome::Claimed { .. } => stats.expansions += 1,
            ExpansionOutcome::BelowThreshold => stats.below_threshold += 1,
            ExpansionOutcome::RollFailed => stats.roll_failed += 1,
            ExpansionOutcome::NoCandidates => stats.no_candidates += 1,
            ExpansionOutcome::InsufficientFood => stats.insufficient_food += 1,
            ExpansionOutcome::TargetClaimed { .. } => stats.target_claimed += 1,
        }
    }
}

/// Result of the read-only planning half of an expansion attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExpansionPlan {
    Settled(ExpansionOutcome),
    Target(ExpansionCandidate),
}

/// `factor^distance` with the factor held to [0, 1] so the weight never
/// grows with distance.
pub fn distance_decay(distance: u32, factor: f64) -> f64 {
    let factor = if factor.is_finite() {
        factor.clamp(0.0, 1.0)
    } else {
        0.0
    };
    factor.powi(distance.min(i32::MAX as u32) as i32)
}

pub fn terrain_modifier(biome: Biome, config: &ColonizationConfig) -> f64 {
    config.terrain_modifiers.get(biome).clamp(0.0, 1.0)
}

/// Combined food and production yield mapped onto [0, 1].
pub fn resource_value(tile: &Tile, config: &ColonizationConfig) -> f64 {
    let total = tile.food_yield.max(0.0) + tile.production_yield.max(0.0);
    (total / config.yield_normalization).clamp(0.0, 1.0)
}

pub fn strategic_multiplier(flags: &StrategicFlags, bonuses: &StrategicBonuses) -> f64 {
    let mut multiplier = 1.0;
    if flags.river {
        multiplier += bonuses.river;
    }
    if flags.coastal {
        multiplier += bonuses.coastal;
    }
    if flags.fertile {
        multiplier += bonuses.fertile;
    }
    if flags.mountain_pass {
        multiplier += bonuses.mountain_pass;
    }
    if flags.resource_deposit {
        multiplier += bonuses.resource_deposit;
    }
    multiplier
}

pub fn pressure_factor(population: f64, capacity: f64, config: &ColonizationConfig) -> f64 {
    let load = capacity_load(population, capacity);
    load.clamp(config.min_pressure_factor, config.max_pressure_factor)
}

/// Search radius around owned tiles. Grows linearly from the base range with
/// no excess population to the max range at twice carrying capacity.
pub fn colonization_reach(population: f64, capacity: f64, config: &ColonizationConfig) -> u32 {
    let base = config.base_colonization_range.min(config.max_colonization_range);
    let max = config.max_colonization_range;
    let excess = (capacity_load(population, capacity) - 1.0).clamp(0.0, 1.0);
    let extra = ((max - base) as f64 * excess).round() as u32;
    (base + extra).min(max)
}

pub fn score_tile(tile: &Tile, distance: u32, pressure: f64, config: &ColonizationConfig) -> f64 {
    distance_decay(distance, config.distance_decay_factor)
        * terrain_modifier(tile.biome, config)
        * resource_value(tile, config)
        * strategic_multiplier(&tile.flags, &config.strategic_bonuses)
        * pressure
}

/// Unowned, passable tiles within reach of `civ`, scored, in coordinate order.
/// Tiles scoring zero are left out.
pub fn enumerate_candidates(
    civ: &Civilization,
    tiles: &TileMap,
    config: &ColonizationConfig,
    capacity: f64,
) -> Vec<ExpansionCandidate> {
    let population = civ.population();
    let reach = colonization_reach(population, capacity, config);
    let pressure = pressure_factor(population, capacity, config);

    let mut nearest: BTreeMap<HexCoord, u32> = BTreeMap::new();
    for owned in &civ.tiles {
        for coord in owned.range(reach) {
            let distance = owned.distance(coord);
            nearest
                .entry(coord)
                .and_modify(|d| *d = (*d).min(distance))
                .or_insert(distance);
        }
    }

    nearest
        .into_iter()
        .filter_map(|(coord, distance)| {
            let tile = tiles.get(&coord)?;
            if tile.is_owned() || terrain_modifier(tile.biome, config) <= 0.0 {
                return None;
            }
            let score = score_tile(tile, distance, pressure, config);
            (score > 0.0 && score.is_finite()).then_some(ExpansionCandidate {
                target: coord,
                distance,
                score,
            })
        })
        .collect()
}

/// Score-weighted pick with a single uniform draw.
pub fn roulette_select<'a, R: Rng + ?Sized>(
    candidates: &'a [ExpansionCandidate],
    rng: &mut R,
) -> Option<&'a ExpansionCandidate> {
    let total: f64 = candidates.iter().map(|c| c.score.max(0.0)).sum();
    if !(total > 0.0 && total.is_finite()) {
        return None;
    }
    let draw = rng.gen::<f64>() * total;
    let mut cumulative = 0.0;
    for candidate in candidates {
        cumulative += candidate.score.max(0.0);
        if cumulative > draw {
            return Some(candidate);
        }
    }
    candidates.iter().rev().find(|c| c.score > 0.0)
}

/// Gate, roll and pick a target without touching any state.
pub fn plan_expansion<R: Rng + ?Sized>(
    civ: &Civilization,
    tiles: &TileMap,
    config: &SimulationConfig,
    rng: &mut R,
) -> ExpansionPlan {
    let colonization = &config.colonization;
    if civ.population() < colonization.population_pressure_threshold {
        return ExpansionPlan::Settled(ExpansionOutcome::BelowThreshold);
    }
    if rng.gen::<f64>() >= colonization.expansion_attempt_probability {
        return ExpansionPlan::Settled(ExpansionOutcome::RollFailed);
    }
    let capacity = territory_capacity(tiles, civ, config.demography.carrying_capacity_per_food);
    let candidates = enumerate_candidates(civ, tiles, colonization, capacity);
    match roulette_select(&candidates, rng) {
        Some(candidate) => ExpansionPlan::Target(*candidate),
        None => ExpansionPlan::Settled(ExpansionOutcome::NoCandidates),
    }
}

/// Transfers `candidate` to `civ` and pays the settler costs. People already
/// on the tile join the civilization with the stable age profile; the
/// settlers wait on the tile until the next demography pass.
pub fn apply_claim(
    civ: &mut Civilization,
    tiles: &mut TileMap,
    candidate: ExpansionCandidate,
    config: &ColonizationConfig,
) -> ExpansionOutcome {
    let Some(tile) = tiles.get_mut(&candidate.target) else {
        return ExpansionOutcome::NoCandidates;
    };
    if tile.is_owned() {
        return ExpansionOutcome::TargetClaimed {
            target: candidate.target,
        };
    }
    if civ.food_stockpile < config.settler_food_cost {
        return ExpansionOutcome::InsufficientFood;
    }

    let settlers = civ
        .cohorts
        .remove(AgeBand::Prime, config.settler_population_cost);
    civ.cohorts.add_population(tile.population.max(0.0), &STABLE_PROFILE);
    tile.owner = Some(civ.id);
    tile.population = settlers;
    civ.tiles.insert(candidate.target);
    civ.food_stockpile = (civ.food_stockpile - config.settler_food_cost).max(0.0);

    ExpansionOutcome::Claimed {
        target: candidate.target,
        distance: candidate.distance,
        score: candidate.score,
        settlers,
    }
}

/// One full expansion attempt for a single civilization.
pub fn attempt_expansion<R: Rng + ?Sized>(
    civ: &mut Civilization,
    tiles: &mut TileMap,
    config: &SimulationConfig,
    rng: &mut R,
) -> ExpansionOutcome {
    match plan_expansion(civ, tiles, config, rng) {
        ExpansionPlan::Settled(outcome) => outcome,
        ExpansionPlan::Target(candidate) => {
            apply_claim(civ, tiles, candidate, &config.colonization)
        }
    }
}

pub struct ColonizationSystem;

impl ColonizationSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ColonizationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ColonizationSystem {
    fn name(&self) -> &str {
        "colonization"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let World {
            tiles, civs, stats, ..
        } = world;

        let plans: Vec<(CivId, ExpansionPlan)> = civs
            .iter()
            .map(|civ| (civ.id, plan_expansion(civ, tiles, ctx.config, rng)))
            .collect();

        for (id, plan) in plans {
            let outcome = match plan {
                ExpansionPlan::Settled(outcome) => outcome,
                ExpansionPlan::Target(candidate) => match civs.get_mut(id) {
                    Some(civ) => apply_claim(civ, tiles, candidate, &ctx.config.colonization),
                    None => continue,
                },
            };
            outcome.record(stats);
            if let ExpansionOutcome::Claimed {
                target,
                distance,
                score,
                settlers,
            } = outcome
            {
                debug!(
                    turn = ctx.turn,
                    civ = %id,
                    %target,
                    distance,
                    score,
                    settlers,
                    "tile claimed"
                );
            }
        }
        Ok(())
    }
}
