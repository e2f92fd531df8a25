use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    cohort::{CohortBreakdown, CohortState, STABLE_PROFILE},
    components::{CivId, Civilization, Tile},
    hex::HexCoord,
    naming::{CultureIdentity, LinguisticStyle},
};

pub type TileMap = BTreeMap<HexCoord, Tile>;

/// Counters for the turn in progress. Reset before the first system runs.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnStats {
    pub expansion_attempts: u32,
    pub expansions: u32,
    pub below_threshold: u32,
    pub roll_failed: u32,
    pub no_candidates: u32,
    pub insufficient_food: u32,
    pub target_claimed: u32,
    pub spawn_candidates: u32,
    pub spawns: u32,
}

impl TurnStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Everything needed to register a new civilization.
#[derive(Debug, Clone)]
pub struct Founding {
    pub origin: HexCoord,
    pub territory: Vec<HexCoord>,
    pub identity: CultureIdentity,
    pub cohorts: CohortState,
    pub food_stockpile: f64,
    pub founded_turn: u64,
}

#[derive(Debug, Default, Clone)]
pub struct CivRegistry {
    civs: BTreeMap<CivId, Civilization>,
    next_id: u32,
}

impl CivRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids are never reused.
    pub fn allocate_id(&mut self) -> CivId {
        let id = CivId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, civ: Civilization) {
        if civ.id.0 >= self.next_id {
            self.next_id = civ.id.0 + 1;
        }
        self.civs.insert(civ.id, civ);
    }

    /// Id the next founded civilization will receive.
    pub fn peek_next_id(&self) -> CivId {
        CivId(self.next_id)
    }

    /// See [`World::found_civilization`].
    pub fn found(&mut self, tiles: &mut TileMap, founding: Founding) -> CivId {
        let id = self.allocate_id();
        let mut owned = BTreeSet::new();
        let mut cohorts = founding.cohorts;
        for coord in &founding.territory {
            if let Some(tile) = tiles.get_mut(coord) {
                if tile.owner.is_none() {
                    tile.owner = Some(id);
                    cohorts.add_population(tile.population.max(0.0), &STABLE_PROFILE);
                    tile.population = 0.0;
                    owned.insert(*coord);
                }
            }
        }
        self.insert(Civilization {
            id,
            name: founding.identity.name,
            culture_name: founding.identity.culture_name,
            style: founding.identity.style,
            color: founding.identity.color,
            origin: founding.origin,
            founded_turn: founding.founded_turn,
            tiles: owned,
            food_stockpile: founding.food_stockpile.max(0.0),
            cohorts,
            carrying_capacity: 0.0,
        });
        id
    }

    pub fn get(&self, id: CivId) -> Option<&Civilization> {
        self.civs.get(&id)
    }

    pub fn get_mut(&mut self, id: CivId) -> Option<&mut Civilization> {
        self.civs.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Civilization> {
        self.civs.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Civilization> {
        self.civs.values_mut()
    }

    pub fn len(&self) -> usize {
        self.civs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.civs.is_empty()
    }
}

/// Sum of food yield over `territory`.
pub fn territory_food<'a>(
    tiles: &TileMap,
    territory: impl IntoIterator<Item = &'a HexCoord>,
) -> f64 {
    territory
        .into_iter()
        .filter_map(|coord| tiles.get(coord))
        .map(|tile| tile.food_yield.max(0.0))
        .sum()
}

pub fn territory_capacity(tiles: &TileMap, civ: &Civilization, per_food: f64) -> f64 {
    territory_food(tiles, &civ.tiles) * per_food
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CivSnapshot {
    pub id: u32,
    pub name: String,
    pub culture: String,
    pub style: LinguisticStyle,
    pub color: String,
    pub origin: HexCoord,
    pub founded_turn: u64,
    pub tile_count: usize,
    pub population: u64,
    pub cohorts: CohortBreakdown,
    pub workforce: u64,
    pub food: f64,
    pub carrying_capacity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub turn: u64,
    pub years_elapsed: f64,
    pub total_population: u64,
    pub unaffiliated_population: u64,
    pub owned_tiles: usize,
    pub stats: TurnStats,
    pub civilizations: Vec<CivSnapshot>,
}

pub struct World {
    turn: u64,
    years_elapsed: f64,
    dt_years: f64,
    pub(crate) tiles: TileMap,
    pub(crate) civs: CivRegistry,
    pub(crate) stats: TurnStats,
}

impl World {
    pub fn new(dt_years: f64) -> Self {
        Self {
            turn: 0,
            years_elapsed: 0.0,
            dt_years,
            tiles: TileMap::new(),
            civs: CivRegistry::new(),
            stats: TurnStats::default(),
        }
    }

    pub fn insert_tile(&mut self, tile: Tile) {
        self.tiles.insert(tile.coord, tile);
    }

    /// Registers a civilization and claims every listed tile that exists and
    /// is still unowned. People already living on a claimed tile join the new
    /// civilization with the stable age profile. Returns the new id.
    pub fn found_civilization(&mut self, founding: Founding) -> CivId {
        self.civs.found(&mut self.tiles, founding)
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn dt_years(&self) -> f64 {
        self.dt_years
    }

    pub fn years_elapsed(&self) -> f64 {
        self.years_elapsed
    }

    pub fn advance_time(&mut self) {
        self.turn += 1;
        self.years_elapsed += self.dt_years;
    }

    pub fn tiles(&self) -> &TileMap {
        &self.tiles
    }

    pub fn tile(&self, coord: HexCoord) -> Option<&Tile> {
        self.tiles.get(&coord)
    }

    pub fn tile_mut(&mut self, coord: HexCoord) -> Option<&mut Tile> {
        self.tiles.get_mut(&coord)
    }

    pub fn civs(&self) -> &CivRegistry {
        &self.civs
    }

    pub fn civ(&self, id: CivId) -> Option<&Civilization> {
        self.civs.get(id)
    }

    pub fn civ_mut(&mut self, id: CivId) -> Option<&mut Civilization> {
        self.civs.get_mut(id)
    }

    pub fn stats(&self) -> &TurnStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut TurnStats {
        &mut self.stats
    }

    pub fn unaffiliated_population(&self) -> f64 {
        self.tiles.values().map(|tile| tile.population.max(0.0)).sum()
    }

    /// Civilization cohorts plus every tile's unaffiliated population.
    pub fn total_population(&self) -> f64 {
        let civilized: f64 = self.civs.iter().map(Civilization::population).sum();
        civilized + self.unaffiliated_population()
    }

    pub fn snapshot(&self, scenario: &str) -> WorldSnapshot {
        let civilizations = self
            .civs
            .iter()
            .map(|civ| CivSnapshot {
                id: civ.id.raw(),
                name: civ.name.clone(),
                culture: civ.culture_name.clone(),
                style: civ.style,
                color: civ.color.hex(),
                origin: civ.origin,
                founded_turn: civ.founded_turn,
                tile_count: civ.tiles.len(),
                population: civ.population().round() as u64,
                cohorts: civ.cohorts.breakdown(),
                workforce: civ.workforce().round() as u64,
                food: civ.food_stockpile,
                carrying_capacity: civ.carrying_capacity,
            })
            .collect();
        WorldSnapshot {
            scenario: scenario.to_string(),
            turn: self.turn,
            years_elapsed: self.years_elapsed,
            total_population: self.total_population().round() as u64,
            unaffiliated_population: self.unaffiliated_population().round() as u64,
            owned_tiles: self.tiles.values().filter(|tile| tile.is_owned()).count(),
            stats: self.stats.clone(),
            civilizations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cohort::AgeBand,
        components::{Biome, Rgb},
    };

    fn identity() -> CultureIdentity {
        CultureIdentity {
            name: "Tarvia".into(),
            culture_name: "Tarvians".into(),
            style: LinguisticStyle::Latin,
            color: Rgb {
                r: 10,
                g: 20,
                b: 30,
            },
        }
    }

    fn founding(origin: HexCoord, territory: Vec<HexCoord>, population: f64) -> Founding {
        Founding {
            origin,
            territory,
            identity: identity(),
            cohorts: CohortState::from_total(population, &STABLE_PROFILE),
            food_stockpile: 10.0,
            founded_turn: 0,
        }
    }

    #[test]
    fn founding_skips_owned_and_missing_tiles() {
        let mut world = World::new(1.0 / 52.0);
        for q in 0..3 {
            world.insert_tile(Tile::new(HexCoord::new(q, 0), Biome::Plains));
        }
        let first = world.found_civilization(founding(
            HexCoord::new(0, 0),
            vec![HexCoord::new(0, 0), HexCoord::new(1, 0)],
            100.0,
        ));
        let second = world.found_civilization(founding(
            HexCoord::new(2, 0),
            vec![HexCoord::new(1, 0), HexCoord::new(2, 0), HexCoord::new(9, 9)],
            50.0,
        ));

        assert_ne!(first, second);
        assert_eq!(world.civ(first).unwrap().tiles.len(), 2);
        let second_tiles: Vec<_> = world.civ(second).unwrap().tiles.iter().copied().collect();
        assert_eq!(second_tiles, vec![HexCoord::new(2, 0)]);
        assert_eq!(world.tile(HexCoord::new(1, 0)).unwrap().owner, Some(first));
    }

    #[test]
    fn founding_absorbs_wild_people_across_all_bands() {
        let mut world = World::new(1.0 / 52.0);
        let home = HexCoord::new(0, 0);
        world.insert_tile(Tile::new(home, Biome::Plains).with_population(50.0));
        let id = world.found_civilization(founding(home, vec![home], 100.0));

        let civ = world.civ(id).unwrap();
        assert!((civ.population() - 150.0).abs() < 1e-9);
        assert!((civ.cohorts.get(AgeBand::Children) - 15.0).abs() < 1e-9);
        assert!((civ.cohorts.get(AgeBand::Elderly) - 21.0).abs() < 1e-9);
        assert_eq!(world.tile(home).unwrap().population, 0.0);
    }

    #[test]
    fn snapshot_reports_rounded_totals() {
        let mut world = World::new(1.0 / 52.0);
        world.insert_tile(Tile::new(HexCoord::new(0, 0), Biome::Plains));
        world.insert_tile(Tile::new(HexCoord::new(5, 0), Biome::Plains).with_population(12.4));
        world.found_civilization(founding(HexCoord::new(0, 0), vec![HexCoord::new(0, 0)], 100.0));
        world.advance_time();

        let snapshot = world.snapshot("test");
        assert_eq!(snapshot.turn, 1);
        assert_eq!(snapshot.total_population, 112);
        assert_eq!(snapshot.unaffiliated_population, 12);
        assert_eq!(snapshot.owned_tiles, 1);
        assert_eq!(snapshot.civilizations[0].population, 100);
        assert_eq!(snapshot.civilizations[0].color, "#0a141e");
    }

    #[test]
    fn registry_ids_never_repeat() {
        let mut registry = CivRegistry::new();
        let a = registry.allocate_id();
        let b = registry.allocate_id();
        assert!(b > a);
    }
}
