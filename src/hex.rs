//! Axial hex coordinates.
//!
//! The map is stored as a `q × r` rectangle in axial space. Distances are
//! geometric hex distances and ignore map bounds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Neighbour offsets, starting east and walking counter-clockwise.
pub const DIRECTIONS: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    pub fn distance(self, other: HexCoord) -> u32 {
        let dq = self.q - other.q;
        let dr = self.r - other.r;
        ((dq.abs() + dr.abs() + (dq + dr).abs()) / 2) as u32
    }

    pub fn neighbors(self) -> impl Iterator<Item = HexCoord> {
        DIRECTIONS
            .iter()
            .map(move |(dq, dr)| HexCoord::new(self.q + dq, self.r + dr))
    }

    /// Every coordinate within `radius` steps, the centre included.
    pub fn range(self, radius: u32) -> impl Iterator<Item = HexCoord> {
        let n = radius as i32;
        (-n..=n).flat_map(move |dq| {
            let lo = (-n).max(-dq - n);
            let hi = n.min(-dq + n);
            (lo..=hi).map(move |dr| HexCoord::new(self.q + dq, self.r + dr))
        })
    }

    /// Smallest distance from `self` to any of `others`, `None` when empty.
    pub fn nearest_distance<'a>(
        self,
        others: impl IntoIterator<Item = &'a HexCoord>,
    ) -> Option<u32> {
        others.into_iter().map(|other| self.distance(*other)).min()
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let a = HexCoord::new(2, -1);
        let b = HexCoord::new(-3, 4);
        assert_eq!(a.distance(a), 0);
        assert_eq!(a.distance(b), b.distance(a));
        assert_eq!(a.distance(b), 5);
    }

    #[test]
    fn neighbors_are_one_step_away() {
        let center = HexCoord::new(0, 0);
        let neighbors: Vec<_> = center.neighbors().collect();
        assert_eq!(neighbors.len(), 6);
        assert!(neighbors.iter().all(|n| center.distance(*n) == 1));
    }

    #[test]
    fn range_counts_match_hex_numbers() {
        let center = HexCoord::new(5, 5);
        assert_eq!(center.range(0).count(), 1);
        assert_eq!(center.range(1).count(), 7);
        assert_eq!(center.range(3).count(), 37);
        assert!(center.range(3).all(|c| center.distance(c) <= 3));
    }
}
