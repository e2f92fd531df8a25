use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{cohort::CohortState, hex::HexCoord, naming::LinguisticStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CivId(pub u32);

impl CivId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CivId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "civ#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Biome {
    Ocean,
    Coast,
    Plains,
    Grassland,
    Forest,
    Hills,
    Tundra,
    Swamp,
    Desert,
    Mountain,
}

impl Biome {
    pub const ALL: [Biome; 10] = [
        Biome::Ocean,
        Biome::Coast,
        Biome::Plains,
        Biome::Grassland,
        Biome::Forest,
        Biome::Hills,
        Biome::Tundra,
        Biome::Swamp,
        Biome::Desert,
        Biome::Mountain,
    ];

    /// Yields used when a scenario does not override them: `(food, production)`.
    pub fn default_yields(self) -> (f64, f64) {
        match self {
            Biome::Ocean => (1.0, 0.0),
            Biome::Coast => (2.0, 0.5),
            Biome::Plains => (2.0, 1.0),
            Biome::Grassland => (2.0, 0.5),
            Biome::Forest => (1.0, 2.0),
            Biome::Hills => (1.0, 2.0),
            Biome::Tundra => (0.5, 0.5),
            Biome::Swamp => (1.0, 0.0),
            Biome::Desert => (0.25, 0.5),
            Biome::Mountain => (0.0, 1.0),
        }
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Biome::Ocean => "ocean",
            Biome::Coast => "coast",
            Biome::Plains => "plains",
            Biome::Grassland => "grassland",
            Biome::Forest => "forest",
            Biome::Hills => "hills",
            Biome::Tundra => "tundra",
            Biome::Swamp => "swamp",
            Biome::Desert => "desert",
            Biome::Mountain => "mountain",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategicFlags {
    pub river: bool,
    pub coastal: bool,
    pub fertile: bool,
    pub mountain_pass: bool,
    pub resource_deposit: bool,
}

impl StrategicFlags {
    pub fn any(&self) -> bool {
        self.river || self.coastal || self.fertile || self.mountain_pass || self.resource_deposit
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub coord: HexCoord,
    pub biome: Biome,
    pub food_yield: f64,
    pub production_yield: f64,
    pub flags: StrategicFlags,
    pub owner: Option<CivId>,
    /// People on this tile not counted in any civilization's cohorts.
    pub population: f64,
}

impl Tile {
    pub fn new(coord: HexCoord, biome: Biome) -> Self {
        let (food_yield, production_yield) = biome.default_yields();
        Self {
            coord,
            biome,
            food_yield,
            production_yield,
            flags: StrategicFlags::default(),
            owner: None,
            population: 0.0,
        }
    }

    pub fn with_flags(mut self, flags: StrategicFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_yields(mut self, food: f64, production: f64) -> Self {
        self.food_yield = food;
        self.production_yield = production;
        self
    }

    pub fn with_population(mut self, population: f64) -> Self {
        self.population = population;
        self
    }

    pub fn is_owned(&self) -> bool {
        self.owner.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Civilization {
    pub id: CivId,
    pub name: String,
    pub culture_name: String,
    pub style: LinguisticStyle,
    pub color: Rgb,
    pub origin: HexCoord,
    pub founded_turn: u64,
    pub tiles: BTreeSet<HexCoord>,
    pub food_stockpile: f64,
    pub cohorts: CohortState,
    /// Capacity computed by the last demography pass.
    pub carrying_capacity: f64,
}

impl Civilization {
    pub fn population(&self) -> f64 {
        self.cohorts.total()
    }

    pub fn workforce(&self) -> f64 {
        self.cohorts.workforce()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tile_takes_biome_yields() {
        let tile = Tile::new(HexCoord::new(1, 2), Biome::Forest);
        assert_eq!(tile.food_yield, 1.0);
        assert_eq!(tile.production_yield, 2.0);
        assert!(!tile.is_owned());
        assert!(!tile.flags.any());
    }

    #[test]
    fn biome_names_match_serde() {
        for biome in Biome::ALL {
            let yaml = serde_yaml::to_string(&biome).unwrap();
            assert_eq!(yaml.trim(), biome.to_string());
        }
    }

    #[test]
    fn rgb_formats_as_css_hex() {
        let color = Rgb {
            r: 230,
            g: 69,
            b: 0,
        };
        assert_eq!(color.hex(), "#e64500");
    }
}
