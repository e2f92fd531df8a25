use anyhow::Result;
use tracing::warn;

use crate::{
    components::CivId,
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

/// End-of-turn invariant pass: clamps counts at zero and reconciles tile
/// ownership with each civilization's territory set. Tile `owner` wins.
pub struct BookkeepingSystem;

impl BookkeepingSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BookkeepingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BookkeepingSystem {
    fn name(&self) -> &str {
        "bookkeeping"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let repairs = reconcile(world);
        if repairs > 0 {
            warn!(turn = ctx.turn, repairs, "ownership invariants repaired");
        }
        Ok(())
    }
}

/// Returns the number of corrections made.
pub fn reconcile(world: &mut World) -> usize {
    let World { tiles, civs, .. } = world;
    let mut repairs = 0;

    for tile in tiles.values_mut() {
        if !(tile.population.is_finite() && tile.population >= 0.0) {
            tile.population = 0.0;
            repairs += 1;
        }
        if let Some(owner) = tile.owner {
            match civs.get_mut(owner) {
                Some(civ) => {
                    if civ.tiles.insert(tile.coord) {
                        repairs += 1;
                    }
                }
                None => {
                    tile.owner = None;
                    repairs += 1;
                }
            }
        }
    }

    for civ in civs.iter_mut() {
        let id: CivId = civ.id;
        let before = civ.tiles.len();
        civ.tiles
            .retain(|coord| tiles.get(coord).is_some_and(|tile| tile.owner == Some(id)));
        repairs += before - civ.tiles.len();

        let bands_before = *civ.cohorts.bands();
        civ.cohorts.clamp_non_negative();
        if *civ.cohorts.bands() != bands_before {
            repairs += 1;
        }
        if !(civ.food_stockpile.is_finite() && civ.food_stockpile >= 0.0) {
            civ.food_stockpile = 0.0;
            repairs += 1;
        }
    }
    repairs
}
