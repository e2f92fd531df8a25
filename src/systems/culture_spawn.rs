//! Emergence of new civilizations from isolated unaffiliated populations.

use std::collections::{BTreeSet, VecDeque};

use anyhow::Result;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    cohort::CohortState,
    components::{Biome, CivId},
    config::{ColonizationConfig, SimulationConfig},
    engine::{System, SystemContext},
    hex::HexCoord,
    naming::{dominant_biome, generate_identity, region_seed},
    rng::SystemRng,
    systems::colonization::{resource_value, terrain_modifier},
    world::{CivRegistry, Founding, TileMap, World},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpawnCandidate {
    /// Region tiles in coordinate order.
    pub tiles: Vec<HexCoord>,
    pub population: f64,
    /// Distance to the nearest owned tile, `None` when nothing is owned.
    pub isolation: Option<u32>,
    pub resource_value: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpawnReport {
    /// False when the turn is not a spawn-check turn.
    pub checked: bool,
    pub candidates: Vec<SpawnCandidate>,
    pub spawned: Vec<CivId>,
}

/// Hex-contiguous groups of unowned, populated, passable tiles. Regions are
/// seeded from the lowest coordinate first and each region is sorted.
pub fn find_regions(tiles: &TileMap, config: &ColonizationConfig) -> Vec<Vec<HexCoord>> {
    let eligible = |coord: &HexCoord| {
        tiles.get(coord).is_some_and(|tile| {
            !tile.is_owned()
                && tile.population > 0.0
                && terrain_modifier(tile.biome, config) > 0.0
        })
    };

    let mut visited: BTreeSet<HexCoord> = BTreeSet::new();
    let mut regions = Vec::new();
    for coord in tiles.keys() {
        if visited.contains(coord) || !eligible(coord) {
            continue;
        }
        let mut region = Vec::new();
        let mut queue = VecDeque::from([*coord]);
        visited.insert(*coord);
        while let Some(current) = queue.pop_front() {
            region.push(current);
            for next in current.neighbors() {
                if !visited.contains(&next) && eligible(&next) {
                    visited.insert(next);
                    queue.push_back(next);
                }
            }
        }
        region.sort();
        regions.push(region);
    }
    regions
}

pub fn isolation_distance(region: &[HexCoord], owned: &[HexCoord]) -> Option<u32> {
    region
        .iter()
        .filter_map(|coord| coord.nearest_distance(owned))
        .min()
}

/// Regions that pass the isolation and population gates, scored.
pub fn evaluate_regions(tiles: &TileMap, config: &SimulationConfig) -> Vec<SpawnCandidate> {
    let spawning = &config.culture_spawning;
    let owned: Vec<HexCoord> = tiles
        .values()
        .filter(|tile| tile.is_owned())
        .map(|tile| tile.coord)
        .collect();

    find_regions(tiles, &config.colonization)
        .into_iter()
        .filter_map(|region| {
            let isolation = isolation_distance(&region, &owned);
            if isolation.is_some_and(|d| d < spawning.isolation_threshold_hexes) {
                return None;
            }
            let population: f64 = region
                .iter()
                .filter_map(|c| tiles.get(c))
                .map(|t| t.population)
                .sum();
            if population < spawning.min_spawn_population {
                return None;
            }
            let resource_value = region
                .iter()
                .filter_map(|c| tiles.get(c))
                .map(|t| resource_value(t, &config.colonization))
                .sum::<f64>()
                / region.len() as f64;
            let effective_isolation = isolation
                .unwrap_or(spawning.isolation_score_cap)
                .min(spawning.isolation_score_cap);
            let score = (population / 100.0) * (1.0 + resource_value) * effective_isolation as f64;
            Some(SpawnCandidate {
                tiles: region,
                population,
                isolation,
                resource_value,
                score,
            })
        })
        .collect()
}

/// Spawn probability for one candidate given the mean candidate score.
pub fn spawn_probability(
    candidate: &SpawnCandidate,
    mean_score: f64,
    config: &SimulationConfig,
) -> f64 {
    let spawning = &config.culture_spawning;
    let base = spawning.base_spawn_probability;
    let p = if spawning.scale_probability_by_score && mean_score > 0.0 {
        base * candidate.score / mean_score
    } else {
        base
    };
    p.clamp(0.0, 1.0)
}

/// Runs a spawn check when `turn` is a multiple of the spawn interval.
pub fn check_culture_spawn<R: Rng + ?Sized>(
    tiles: &mut TileMap,
    registry: &mut CivRegistry,
    config: &SimulationConfig,
    turn: u64,
    rng: &mut R,
) -> SpawnReport {
    let interval = config.culture_spawning.spawn_interval_turns.max(1);
    if turn % interval != 0 {
        return SpawnReport::default();
    }

    let candidates = evaluate_regions(tiles, config);
    let mean_score = if candidates.is_empty() {
        0.0
    } else {
        candidates.iter().map(|c| c.score).sum::<f64>() / candidates.len() as f64
    };

    let mut spawned = Vec::new();
    for candidate in &candidates {
        let p = spawn_probability(candidate, mean_score, config);
        if rng.gen::<f64>() >= p {
            continue;
        }
        let id = spawn_civilization(tiles, registry, candidate, config, turn);
        info!(
            turn,
            civ = %id,
            name = registry.get(id).map(|c| c.name.as_str()).unwrap_or_default(),
            tiles = candidate.tiles.len(),
            population = candidate.population,
            "new civilization emerged"
        );
        spawned.push(id);
    }

    SpawnReport {
        checked: true,
        candidates,
        spawned,
    }
}

fn spawn_civilization(
    tiles: &mut TileMap,
    registry: &mut CivRegistry,
    candidate: &SpawnCandidate,
    config: &SimulationConfig,
    turn: u64,
) -> CivId {
    let composition: Vec<_> = candidate
        .tiles
        .iter()
        .filter_map(|c| tiles.get(c))
        .map(|t| (t.coord, t.biome))
        .collect();
    let seed = region_seed(&composition, registry.peek_next_id().raw() as u64);
    let dominant = dominant_biome(composition.iter().map(|(_, biome)| *biome));
    let identity = generate_identity(seed, dominant.unwrap_or(Biome::Plains));

    let origin = candidate
        .tiles
        .iter()
        .filter_map(|c| tiles.get(c))
        .fold(None::<(HexCoord, f64)>, |best, tile| match best {
            Some((_, pop)) if pop >= tile.population => best,
            _ => Some((tile.coord, tile.population)),
        })
        .map(|(coord, _)| coord)
        .unwrap_or(candidate.tiles[0]);

    registry.found(
        tiles,
        Founding {
            origin,
            territory: candidate.tiles.clone(),
            identity,
            // Founding moves the region's people into the cohorts.
            cohorts: CohortState::default(),
            food_stockpile: config.culture_spawning.initial_food_stockpile,
            founded_turn: turn,
        },
    )
}

pub struct CultureSpawnSystem;

impl CultureSpawnSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CultureSpawnSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for CultureSpawnSystem {
    fn name(&self) -> &str {
        "culture_spawn"
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
        let report = check_culture_spawn(tiles, civs, ctx.config, ctx.turn, rng);
        if report.checked {
            stats.spawn_candidates += report.candidates.len() as u32;
            stats.spawns += report.spawned.len() as u32;
            debug!(
                turn = ctx.turn,
                candidates = report.candidates.len(),
                spawned = report.spawned.len(),
                "culture spawn check"
            );
        }
        Ok(())
    }
}
