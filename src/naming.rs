//! Culture identities for newly spawned civilizations.
//!
//! Names are built from syllables drawn out of a per-style phonology. A
//! region's dominant biome picks the style and the region's geometry seeds
//! the generator, so the same region always yields the same identity.

use std::collections::BTreeMap;
use std::fmt;

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::{
    components::{Biome, Rgb},
    hex::HexCoord,
};

const SATURATION: f64 = 0.7;
const VALUE: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinguisticStyle {
    Latin,
    Germanic,
    Celtic,
    Slavic,
    Arabic,
    Sinitic,
    Greek,
    Norse,
    Turkic,
    Persian,
}

struct Phonology {
    consonants: &'static [&'static str],
    vowels: &'static [&'static str],
    /// `C` is a consonant, `V` a vowel.
    syllables: &'static [&'static str],
    suffixes: &'static [&'static str],
    forbidden: &'static [&'static str],
    min_syllables: u8,
    max_syllables: u8,
}

const LATIN: Phonology = Phonology {
    consonants: &["b", "c", "d", "f", "g", "h", "l", "m", "n", "p", "r", "s", "t", "v", "x", "z"],
    vowels: &["a", "e", "i", "o", "u"],
    syllables: &["CV", "CVC", "V", "VC"],
    suffixes: &["ia", "us", "um", "ius", "ensis", "anum"],
    forbidden: &["xx", "zz", "hh"],
    min_syllables: 2,
    max_syllables: 4,
};

const GERMANIC: Phonology = Phonology {
    consonants: &[
        "b", "d", "f", "g", "h", "k", "l", "m", "n", "r", "s", "t", "w", "z", "th", "ch", "sch",
    ],
    vowels: &["a", "e", "i", "o", "u", "ae", "ie"],
    syllables: &["CV", "CVC", "CVCC", "CCV"],
    suffixes: &["berg", "heim", "land", "burg", "wald", "hausen"],
    forbidden: &["hh", "ww"],
    min_syllables: 2,
    max_syllables: 3,
};

const CELTIC: Phonology = Phonology {
    consonants: &["b", "c", "d", "f", "g", "l", "m", "n", "r", "s", "t", "w", "th", "ch", "gh"],
    vowels: &["a", "e", "i", "o", "u", "ae", "ei", "ou"],
    syllables: &["CV", "CVC", "V", "CCV"],
    suffixes: &["ach", "agh", "ain", "ead", "ean"],
    forbidden: &["chch", "thth"],
    min_syllables: 2,
    max_syllables: 4,
};

const SLAVIC: Phonology = Phonology {
    consonants: &[
        "b", "c", "d", "g", "k", "l", "m", "n", "p", "r", "s", "t", "v", "z", "zh", "ch", "sh",
    ],
    vowels: &["a", "e", "i", "o", "u", "y"],
    syllables: &["CV", "CVC", "CCV", "CCVC"],
    suffixes: &["ova", "ska", "sky", "grad"],
    forbidden: &["zhzh", "shsh"],
    min_syllables: 2,
    max_syllables: 4,
};

const ARABIC: Phonology = Phonology {
    consonants: &[
        "b", "d", "f", "g", "h", "j", "k", "l", "m", "n", "r", "s", "t", "w", "z", "sh", "kh", "th",
    ],
    vowels: &["a", "e", "i", "o", "u"],
    syllables: &["CV", "CVC", "CVCC"],
    suffixes: &["an", "iya", "stan"],
    forbidden: &["hh"],
    min_syllables: 2,
    max_syllables: 4,
};

const SINITIC: Phonology = Phonology {
    consonants: &[
        "b", "d", "f", "g", "h", "j", "k", "l", "m", "n", "p", "r", "s", "t", "w", "x", "z", "zh",
        "ch", "sh",
    ],
    vowels: &["a", "e", "i", "o", "u", "ao", "ai", "ei", "ou"],
    syllables: &["CV", "CVC"],
    suffixes: &[],
    forbidden: &["xx", "zhzh"],
    min_syllables: 1,
    max_syllables: 3,
};

const GREEK: Phonology = Phonology {
    consonants: &["b", "d", "f", "g", "k", "l", "m", "n", "p", "r", "s", "t", "th", "ph", "ch"],
    vowels: &["a", "e", "i", "o", "u", "ai", "ei", "ou"],
    syllables: &["CV", "CVC", "CCV"],
    suffixes: &["os", "es", "ia", "ikos", "tes"],
    forbidden: &["hh", "phph"],
    min_syllables: 2,
    max_syllables: 4,
};

const NORSE: Phonology = Phonology {
    consonants: &["b", "d", "f", "g", "h", "j", "k", "l", "m", "n", "r", "s", "t", "v"],
    vowels: &["a", "e", "i", "o", "u", "ae", "oe"],
    syllables: &["CV", "CVC", "CCV"],
    suffixes: &["sen", "stad", "borg", "vik"],
    forbidden: &["jj"],
    min_syllables: 2,
    max_syllables: 3,
};

const TURKIC: Phonology = Phonology {
    consonants: &["b", "c", "d", "f", "g", "h", "k", "l", "m", "n", "p", "r", "s", "t", "y", "z"],
    vowels: &["a", "e", "i", "o", "u"],
    syllables: &["CV", "CVC"],
    suffixes: &["li", "ci", "bay", "han"],
    forbidden: &["hh"],
    min_syllables: 2,
    max_syllables: 3,
};

const PERSIAN: Phonology = Phonology {
    consonants: &[
        "b", "d", "f", "g", "h", "j", "k", "l", "m", "n", "r", "s", "t", "v", "z", "sh", "kh",
    ],
    vowels: &["a", "e", "i", "o", "u"],
    syllables: &["CV", "CVC", "CCV"],
    suffixes: &["an", "abad", "shahr", "stan"],
    forbidden: &["hh"],
    min_syllables: 2,
    max_syllables: 4,
};

impl LinguisticStyle {
    pub const ALL: [LinguisticStyle; 10] = [
        LinguisticStyle::Latin,
        LinguisticStyle::Germanic,
        LinguisticStyle::Celtic,
        LinguisticStyle::Slavic,
        LinguisticStyle::Arabic,
        LinguisticStyle::Sinitic,
        LinguisticStyle::Greek,
        LinguisticStyle::Norse,
        LinguisticStyle::Turkic,
        LinguisticStyle::Persian,
    ];

    fn phonology(self) -> &'static Phonology {
        match self {
            LinguisticStyle::Latin => &LATIN,
            LinguisticStyle::Germanic => &GERMANIC,
            LinguisticStyle::Celtic => &CELTIC,
            LinguisticStyle::Slavic => &SLAVIC,
            LinguisticStyle::Arabic => &ARABIC,
            LinguisticStyle::Sinitic => &SINITIC,
            LinguisticStyle::Greek => &GREEK,
            LinguisticStyle::Norse => &NORSE,
            LinguisticStyle::Turkic => &TURKIC,
            LinguisticStyle::Persian => &PERSIAN,
        }
    }

    /// Styles that fit a region dominated by `biome`.
    pub fn candidates_for(biome: Biome) -> &'static [LinguisticStyle] {
        use LinguisticStyle::*;
        match biome {
            Biome::Desert => &[Arabic, Persian],
            Biome::Tundra => &[Norse, Slavic],
            Biome::Forest | Biome::Swamp => &[Germanic, Celtic],
            Biome::Grassland | Biome::Plains => &[Latin, Greek],
            Biome::Hills => &[Celtic, Turkic],
            Biome::Mountain => &[Sinitic, Turkic],
            Biome::Coast | Biome::Ocean => &[Greek, Norse],
        }
    }
}

impl fmt::Display for LinguisticStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LinguisticStyle::Latin => "Latin",
            LinguisticStyle::Germanic => "Germanic",
            LinguisticStyle::Celtic => "Celtic",
            LinguisticStyle::Slavic => "Slavic",
            LinguisticStyle::Arabic => "Arabic",
            LinguisticStyle::Sinitic => "Sinitic",
            LinguisticStyle::Greek => "Greek",
            LinguisticStyle::Norse => "Norse",
            LinguisticStyle::Turkic => "Turkic",
            LinguisticStyle::Persian => "Persian",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CultureIdentity {
    pub name: String,
    pub culture_name: String,
    pub style: LinguisticStyle,
    pub color: Rgb,
}

/// Identity for a region, fully determined by `seed` and `dominant`.
pub fn generate_identity(seed: u64, dominant: Biome) -> CultureIdentity {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let style = LinguisticStyle::candidates_for(dominant)
        .choose(&mut rng)
        .copied()
        .unwrap_or(LinguisticStyle::Latin);
    let place = base_name(style, &mut rng);
    let name = polity_name(&place, style, &mut rng);
    let culture_name = demonym(&place, &mut rng);
    let hue = rng.gen_range(0.0..360.0);
    CultureIdentity {
        name,
        culture_name,
        style,
        color: hsv_to_rgb(hue, SATURATION, VALUE),
    }
}

/// Syllable-built, capitalised root name.
pub fn base_name(style: LinguisticStyle, rng: &mut impl Rng) -> String {
    let phonology = style.phonology();
    for _ in 0..8 {
        let count = rng.gen_range(phonology.min_syllables..=phonology.max_syllables);
        let mut name = String::new();
        for _ in 0..count {
            let pattern = phonology.syllables.choose(rng).copied().unwrap_or("CV");
            for slot in pattern.chars() {
                let pool = if slot == 'C' { phonology.consonants } else { phonology.vowels };
                if let Some(part) = pool.choose(rng) {
                    name.push_str(part);
                }
            }
        }
        if name.len() >= 2 && !phonology.forbidden.iter().any(|seq| name.contains(seq)) {
            return capitalize(&name);
        }
    }
    // Every attempt hit a forbidden sequence; fall back to a plain CV pair.
    let consonant = phonology.consonants.first().copied().unwrap_or("t");
    let vowel = phonology.vowels.first().copied().unwrap_or("a");
    capitalize(&format!("{consonant}{vowel}{consonant}{vowel}"))
}

fn polity_name(place: &str, style: LinguisticStyle, rng: &mut impl Rng) -> String {
    match style.phonology().suffixes.choose(rng) {
        Some(suffix) if rng.gen_bool(0.5) => format!("{place}{suffix}"),
        _ => place.to_string(),
    }
}

fn demonym(place: &str, rng: &mut impl Rng) -> String {
    let stem = place.trim_end_matches(|c: char| "aeiouy".contains(c));
    let stem = if stem.len() < 2 { place } else { stem };
    match rng.gen_range(0..5) {
        0 => format!("{stem}ans"),
        1 => format!("{stem}ese"),
        2 => format!("{stem}ish"),
        3 => format!("{stem}ic"),
        _ => format!("{stem}ian"),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `hue` in degrees, `saturation` and `value` in [0, 1].
pub fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> Rgb {
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = value * saturation;
    let x = c * (1.0 - ((h % 2.0) - 1.0).abs());
    let m = value - c;
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb {
        r: channel(r),
        g: channel(g),
        b: channel(b),
    }
}

/// Most common biome among `biomes`, ties broken by enum order.
pub fn dominant_biome(biomes: impl IntoIterator<Item = Biome>) -> Option<Biome> {
    let mut counts: BTreeMap<Biome, usize> = BTreeMap::new();
    for biome in biomes {
        *counts.entry(biome).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|(a_biome, a), (b_biome, b)| a.cmp(b).then(b_biome.cmp(a_biome)))
        .map(|(biome, _)| biome)
}

/// Seed from a region's centroid and biome composition, salted with `salt`.
pub fn region_seed(tiles: &[(HexCoord, Biome)], salt: u64) -> u64 {
    let n = tiles.len().max(1) as f64;
    let (sum_q, sum_r) = tiles
        .iter()
        .fold((0.0, 0.0), |(q, r), (coord, _)| (q + coord.q as f64, r + coord.r as f64));
    let mut seed = mix(salt, (sum_q / n).to_bits());
    seed = mix(seed, (sum_r / n).to_bits());
    let mut counts = [0u64; Biome::ALL.len()];
    for (_, biome) in tiles {
        counts[*biome as usize] += 1;
    }
    for (index, count) in counts.iter().enumerate() {
        seed = mix(seed, count.wrapping_mul(index as u64 + 1));
    }
    seed
}

fn mix(seed: u64, value: u64) -> u64 {
    let seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    seed ^ value.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_deterministic_per_seed() {
        let a = generate_identity(42, Biome::Plains);
        let b = generate_identity(42, Biome::Plains);
        assert_eq!(a, b);
        assert!(matches!(a.style, LinguisticStyle::Latin | LinguisticStyle::Greek));
        assert!(a.name.chars().next().is_some_and(char::is_uppercase));
        assert!(!a.culture_name.is_empty());
    }

    #[test]
    fn desert_regions_get_desert_styles() {
        for seed in 0..20 {
            let identity = generate_identity(seed, Biome::Desert);
            assert!(matches!(
                identity.style,
                LinguisticStyle::Arabic | LinguisticStyle::Persian
            ));
        }
    }

    #[test]
    fn names_avoid_forbidden_sequences() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for style in LinguisticStyle::ALL {
            for _ in 0..50 {
                let name = base_name(style, &mut rng).to_lowercase();
                assert!(name.len() >= 2);
                for seq in style.phonology().forbidden {
                    assert!(!name.contains(seq), "{style} produced {name}");
                }
            }
        }
    }

    #[test]
    fn hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), Rgb { r: 255, g: 0, b: 0 });
        assert_eq!(hsv_to_rgb(120.0, 1.0, 1.0), Rgb { r: 0, g: 255, b: 0 });
        assert_eq!(hsv_to_rgb(240.0, 1.0, 1.0), Rgb { r: 0, g: 0, b: 255 });
        assert_eq!(
            hsv_to_rgb(17.0, 0.0, 0.5),
            Rgb {
                r: 128,
                g: 128,
                b: 128,
            }
        );
    }

    #[test]
    fn dominant_biome_counts_and_breaks_ties_low() {
        let biomes = [Biome::Forest, Biome::Hills, Biome::Forest, Biome::Plains];
        assert_eq!(dominant_biome(biomes), Some(Biome::Forest));
        assert_eq!(dominant_biome([Biome::Hills, Biome::Plains]), Some(Biome::Plains));
        assert_eq!(dominant_biome([]), None);
    }

    #[test]
    fn region_seed_depends_on_geometry() {
        let a = [(HexCoord::new(0, 0), Biome::Plains), (HexCoord::new(1, 0), Biome::Plains)];
        let b = [(HexCoord::new(4, 0), Biome::Plains), (HexCoord::new(5, 0), Biome::Plains)];
        let c = [(HexCoord::new(0, 0), Biome::Forest), (HexCoord::new(1, 0), Biome::Plains)];
        assert_eq!(region_seed(&a, 1), region_seed(&a, 1));
        assert_ne!(region_seed(&a, 1), region_seed(&b, 1));
        assert_ne!(region_seed(&a, 1), region_seed(&c, 1));
    }
}
