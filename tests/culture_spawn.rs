use std::collections::BTreeSet;

use frontier::{
    cohort::{CohortState, STABLE_PROFILE},
    components::{Biome, Rgb, Tile},
    config::SimulationConfig,
    hex::HexCoord,
    naming::{CultureIdentity, LinguisticStyle},
    systems::{check_culture_spawn, SpawnReport},
    world::{CivRegistry, Founding, TileMap},
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const SPAWN_TURN: u64 = 100;

/// A 12x3 strip of plains with one civilization holding the origin and an
/// unaffiliated group of 20 people split over two tiles starting at `q`.
fn strip_with_region_at(q: i32) -> (TileMap, CivRegistry) {
    let mut tiles = TileMap::new();
    for x in 0..12 {
        for r in 0..3 {
            let coord = HexCoord::new(x, r);
            tiles.insert(coord, Tile::new(coord, Biome::Plains));
        }
    }
    for coord in [HexCoord::new(q, 0), HexCoord::new(q + 1, 0)] {
        tiles.get_mut(&coord).unwrap().population = 10.0;
    }

    let mut registry = CivRegistry::new();
    registry.found(
        &mut tiles,
        Founding {
            origin: HexCoord::new(0, 0),
            territory: vec![HexCoord::new(0, 0)],
            identity: CultureIdentity {
                name: "Elder".into(),
                culture_name: "Elders".into(),
                style: LinguisticStyle::Greek,
                color: Rgb { r: 9, g: 9, b: 9 },
            },
            cohorts: CohortState::from_total(100.0, &STABLE_PROFILE),
            food_stockpile: 10.0,
            founded_turn: 0,
        },
    );
    (tiles, registry)
}

fn spawn_check(
    tiles: &mut TileMap,
    registry: &mut CivRegistry,
    config: &SimulationConfig,
    rng: &mut ChaCha8Rng,
) -> SpawnReport {
    check_culture_spawn(tiles, registry, config, SPAWN_TURN, rng)
}

fn forced_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.culture_spawning.isolation_threshold_hexes = 5;
    config.culture_spawning.min_spawn_population = 15.0;
    config.culture_spawning.base_spawn_probability = 1.0;
    config.culture_spawning.spawn_interval_turns = SPAWN_TURN;
    config
}

#[test]
fn isolated_region_becomes_a_civilization() {
    let (mut tiles, mut registry) = strip_with_region_at(6);
    let region = BTreeSet::from([HexCoord::new(6, 0), HexCoord::new(7, 0)]);
    let mut rng = ChaCha8Rng::seed_from_u64(21);

    let report = spawn_check(&mut tiles, &mut registry, &forced_config(), &mut rng);

    assert!(report.checked);
    assert_eq!(report.candidates.len(), 1);
    assert_eq!(report.candidates[0].isolation, Some(6));
    assert_eq!(report.spawned.len(), 1);
    assert_eq!(registry.len(), 2);

    let civ = registry.get(report.spawned[0]).unwrap();
    assert_eq!(civ.tiles, region);
    assert!((civ.population() - 20.0).abs() < 1e-9);
    assert_eq!(civ.founded_turn, SPAWN_TURN);
    assert_eq!(civ.food_stockpile, 20.0);
    assert!(!civ.name.is_empty());
    assert!(matches!(civ.style, LinguisticStyle::Latin | LinguisticStyle::Greek));

    for coord in &region {
        let tile = &tiles[coord];
        assert_eq!(tile.owner, Some(civ.id));
        assert_eq!(tile.population, 0.0);
    }
    let owned_by_new: BTreeSet<_> = tiles
        .values()
        .filter(|t| t.owner == Some(civ.id))
        .map(|t| t.coord)
        .collect();
    assert_eq!(owned_by_new, region);
}

#[test]
fn region_near_existing_territory_does_not_spawn() {
    let (mut tiles, mut registry) = strip_with_region_at(3);
    let mut rng = ChaCha8Rng::seed_from_u64(21);

    let report = spawn_check(&mut tiles, &mut registry, &forced_config(), &mut rng);

    assert!(report.checked);
    assert!(report.candidates.is_empty());
    assert!(report.spawned.is_empty());
    assert_eq!(registry.len(), 1);
    assert_eq!(tiles[&HexCoord::new(3, 0)].owner, None);
    assert_eq!(tiles[&HexCoord::new(3, 0)].population, 10.0);
}

#[test]
fn small_region_does_not_spawn() {
    let (mut tiles, mut registry) = strip_with_region_at(6);
    tiles.get_mut(&HexCoord::new(7, 0)).unwrap().population = 2.0;
    let mut rng = ChaCha8Rng::seed_from_u64(21);

    let report = spawn_check(&mut tiles, &mut registry, &forced_config(), &mut rng);
    assert!(report.spawned.is_empty());
    assert_eq!(registry.len(), 1);
}

#[test]
fn zero_probability_never_spawns() {
    let (mut tiles, mut registry) = strip_with_region_at(6);
    let mut config = forced_config();
    config.culture_spawning.base_spawn_probability = 0.0;
    let mut rng = ChaCha8Rng::seed_from_u64(21);

    let report = spawn_check(&mut tiles, &mut registry, &config, &mut rng);
    assert_eq!(report.candidates.len(), 1);
    assert!(report.spawned.is_empty());
}

#[test]
fn same_region_yields_same_identity() {
    let spawn = || {
        let (mut tiles, mut registry) = strip_with_region_at(6);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let report = spawn_check(&mut tiles, &mut registry, &forced_config(), &mut rng);
        registry.get(report.spawned[0]).unwrap().clone()
    };
    let a = spawn();
    let b = spawn();
    assert_eq!(a.name, b.name);
    assert_eq!(a.culture_name, b.culture_name);
    assert_eq!(a.color, b.color);
}

#[test]
fn populated_open_sea_never_spawns() {
    let sea = HexCoord::new(4, 4);
    let mut tiles = TileMap::new();
    tiles.insert(sea, Tile::new(sea, Biome::Ocean).with_population(30.0));
    let mut registry = CivRegistry::new();
    let mut rng = ChaCha8Rng::seed_from_u64(21);

    let report = spawn_check(&mut tiles, &mut registry, &forced_config(), &mut rng);

    assert!(report.checked);
    assert!(report.candidates.is_empty());
    assert!(report.spawned.is_empty());
    assert!(registry.is_empty());
    assert_eq!(tiles[&sea].owner, None);
}
