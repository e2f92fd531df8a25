use std::{collections::BTreeSet, path::PathBuf};

use frontier::{
    engine::{EngineBuilder, EngineSettings},
    scenario::{Scenario, ScenarioLoader},
    snapshot::SnapshotFile,
    World, WorldSnapshot,
};
use tempfile::tempdir;

fn scenario_loader() -> ScenarioLoader {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
}

fn scenario_path() -> PathBuf {
    PathBuf::from("scenarios/twin_valleys.yaml")
}

fn load() -> Scenario {
    scenario_loader().load(scenario_path()).expect("scenario parses")
}

fn settings(
    scenario: &Scenario,
    seed: u64,
    snapshot_dir: PathBuf,
    interval: u64,
) -> EngineSettings {
    EngineSettings {
        scenario_name: scenario.name.clone(),
        seed,
        snapshot_interval_ticks: interval,
        snapshot_dir,
    }
}

fn run_scenario(scenario: &Scenario, seed: u64, turns: u64) -> (World, Vec<WorldSnapshot>) {
    let temp = tempdir().expect("tempdir");
    let mut world = scenario.build_world().expect("world builds");
    let mut engine = EngineBuilder::from_config(
        settings(scenario, seed, temp.path().to_path_buf(), 0),
        &scenario.config,
    )
    .build();
    let mut frames = Vec::new();
    engine
        .run_with_hook(&mut world, &scenario.config, turns, |snapshot| frames.push(snapshot))
        .expect("run succeeds");
    (world, frames)
}

fn assert_ownership_consistent(world: &World) {
    let mut seen = BTreeSet::new();
    for civ in world.civs().iter() {
        for coord in &civ.tiles {
            assert!(seen.insert(*coord), "{coord} owned twice");
            assert_eq!(world.tile(*coord).unwrap().owner, Some(civ.id));
        }
        assert!(civ.cohorts.bands().iter().all(|b| *b >= 0.0));
        assert!(civ.food_stockpile >= 0.0);
    }
    let owned = world.tiles().values().filter(|t| t.owner.is_some()).count();
    assert_eq!(owned, seen.len());
    assert!(world.tiles().values().all(|t| t.population >= 0.0));
}

#[test]
fn scenario_loader_reads_fixture() {
    let scenario = load();
    assert_eq!(scenario.name, "twin_valleys");
    assert_eq!(scenario.civilizations.len(), 2);
    assert_eq!(scenario.config.culture_spawning.spawn_interval_turns, 52);
    assert_eq!(scenario.config.colonization.settler_population_cost, 8.0);

    let world = scenario.build_world().expect("world builds");
    assert_eq!(world.tiles().len(), 28 * 18);
    assert_eq!(world.civs().len(), 2);
    let arvenia = world.civs().iter().next().unwrap();
    assert_eq!(arvenia.culture_name, "Arvenians");
    assert_eq!(arvenia.tiles.len(), 7);
    assert_ownership_consistent(&world);
}

#[test]
fn engine_runs_deterministically() {
    let scenario = load();
    let (_, frames_a) = run_scenario(&scenario, scenario.seed, 156);
    let (_, frames_b) = run_scenario(&scenario, scenario.seed, 156);
    let a = serde_json::to_string(&frames_a).unwrap();
    let b = serde_json::to_string(&frames_b).unwrap();
    assert_eq!(a, b);
}

#[test]
fn different_seeds_diverge() {
    let scenario = load();
    let (world_a, _) = run_scenario(&scenario, 1, 260);
    let (world_b, _) = run_scenario(&scenario, 2, 260);
    let a = serde_json::to_string(&world_a.snapshot("x")).unwrap();
    let b = serde_json::to_string(&world_b.snapshot("x")).unwrap();
    assert_ne!(a, b);
}

#[test]
fn invariants_hold_every_turn() {
    let scenario = load();
    let temp = tempdir().expect("tempdir");
    let mut world = scenario.build_world().expect("world builds");
    let mut engine = EngineBuilder::from_config(
        settings(&scenario, scenario.seed, temp.path().to_path_buf(), 0),
        &scenario.config,
    )
    .build();
    for _ in 0..104 {
        engine.run(&mut world, &scenario.config, 1).expect("run succeeds");
        assert_ownership_consistent(&world);
    }
    let snapshot = world.snapshot(&scenario.name);
    let civ_tiles: usize = snapshot.civilizations.iter().map(|c| c.tile_count).sum();
    assert_eq!(snapshot.owned_tiles, civ_tiles);
    assert!(civ_tiles > 14, "civilizations should have expanded, own {civ_tiles}");
}

#[test]
fn engine_runs_hook_each_turn() {
    let scenario = load();
    let (_, frames) = run_scenario(&scenario, scenario.seed, 6);
    let turns: Vec<u64> = frames.iter().map(|f| f.turn).collect();
    assert_eq!(turns, vec![1, 2, 3, 4, 5, 6]);
    assert!(frames.iter().all(|f| f.stats.expansion_attempts == 2));
}

#[test]
fn snapshots_written_on_interval() {
    let scenario = load();
    let temp = tempdir().expect("tempdir");
    let mut world = scenario.build_world().expect("world builds");
    let mut engine = EngineBuilder::from_config(
        settings(&scenario, scenario.seed, temp.path().to_path_buf(), 52),
        &scenario.config,
    )
    .build();
    engine.run(&mut world, &scenario.config, 104).expect("run succeeds");

    let dir = temp.path().join(&scenario.name);
    let mut files: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    files.sort();
    assert_eq!(files, vec!["turn_000052.json", "turn_000104.json"]);

    let text = std::fs::read_to_string(dir.join("turn_000104.json")).unwrap();
    let parsed: SnapshotFile = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed.snapshot.turn, 104);
    assert!((parsed.snapshot.years_elapsed - 2.0).abs() < 1e-9);
    assert_eq!(parsed.snapshot.civilizations.len(), world.civs().len());
}

#[test]
fn disabled_colonization_freezes_borders() {
    let mut scenario = load();
    scenario.config.systems.colonization = false;
    scenario.config.systems.culture_spawning = false;
    let (world, frames) = run_scenario(&scenario, scenario.seed, 104);
    let tiles: Vec<usize> = world.civs().iter().map(|c| c.tiles.len()).collect();
    assert_eq!(tiles, vec![7, 7]);
    assert!(frames.iter().all(|f| f.stats.expansion_attempts == 0));
}
