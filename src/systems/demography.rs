use anyhow::Result;
use tracing::{debug, trace};

use crate::{
    cohort::{advance_cohorts, AgeBand, CohortParams},
    config::DemographyConfig,
    engine::{System, SystemContext},
    rng::SystemRng,
    world::{territory_food, TileMap, World},
};

/// Advances every civilization's cohorts and food stockpile, then grows the
/// unaffiliated population on unowned tiles.
pub struct DemographySystem;

impl DemographySystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DemographySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for DemographySystem {
    fn name(&self) -> &str {
        "demography"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let config = &ctx.config.demography;
        let params = CohortParams::from(config);
        let dt = ctx.dt_years;
        let World { tiles, civs, .. } = world;

        for civ in civs.iter_mut() {
            let mut settlers = 0.0;
            for coord in &civ.tiles {
                if let Some(tile) = tiles.get_mut(coord) {
                    settlers += tile.population.max(0.0);
                    tile.population = 0.0;
                }
            }
            if settlers > 0.0 {
                civ.cohorts.add(AgeBand::Prime, settlers);
                trace!(civ = %civ.id, settlers, "absorbed settlers");
            }

            let food = territory_food(tiles, &civ.tiles);
            let capacity = food * config.carrying_capacity_per_food;
            civ.carrying_capacity = capacity;

            let step = advance_cohorts(&mut civ.cohorts, capacity, dt, &params);

            let produced = food * config.food_output_per_yield * dt;
            let eaten = civ.population() * config.food_consumption_per_capita * dt;
            civ.food_stockpile = (civ.food_stockpile + produced - eaten).max(0.0);

            debug!(
                civ = %civ.id,
                population = civ.population(),
                capacity,
                births = step.births,
                deaths = step.total_deaths(),
                food = civ.food_stockpile,
                "demography step"
            );
        }

        grow_unaffiliated(tiles, config, dt);
        Ok(())
    }
}

/// Logistic growth of people living on unowned tiles toward each tile's own
/// carrying capacity.
pub fn grow_unaffiliated(tiles: &mut TileMap, config: &DemographyConfig, dt: f64) {
    if config.wild_growth_rate <= 0.0 {
        return;
    }
    for tile in tiles.values_mut() {
        if tile.owner.is_some() || tile.population <= 0.0 {
            continue;
        }
        let capacity = tile.food_yield.max(0.0) * config.carrying_capacity_per_food;
        let population = tile.population;
        let growth = if capacity > 0.0 {
            config.wild_growth_rate * population * (1.0 - population / capacity) * dt
        } else {
            -config.wild_growth_rate * population * dt
        };
        let next = population + growth;
        tile.population = if next.is_finite() { next.max(0.0) } else { 0.0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        components::{Biome, Tile},
        hex::HexCoord,
    };

    #[test]
    fn wild_population_approaches_tile_capacity() {
        let config = DemographyConfig {
            wild_growth_rate: 0.5,
            ..DemographyConfig::default()
        };
        let mut tiles = TileMap::new();
        let coord = HexCoord::new(0, 0);
        tiles.insert(coord, Tile::new(coord, Biome::Plains).with_population(10.0));

        for _ in 0..2000 {
            grow_unaffiliated(&mut tiles, &config, 1.0 / 52.0);
        }
        let population = tiles[&coord].population;
        let capacity = 2.0 * config.carrying_capacity_per_food;
        assert!(population > 150.0 && population <= capacity + 1e-9, "{population}");
    }

    #[test]
    fn barren_tiles_lose_wild_population() {
        let config = DemographyConfig::default();
        let mut tiles = TileMap::new();
        let coord = HexCoord::new(0, 0);
        tiles.insert(coord, Tile::new(coord, Biome::Mountain).with_population(10.0));
        grow_unaffiliated(&mut tiles, &config, 1.0);
        let population = tiles[&coord].population;
        assert!(population < 10.0 && population >= 0.0);
    }
}
