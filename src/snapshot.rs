//! Periodic JSON dumps of [`WorldSnapshot`]s.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::world::{World, WorldSnapshot};

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub snapshot: WorldSnapshot,
}

pub struct SnapshotWriter {
    dir: PathBuf,
    interval: u64,
}

impl SnapshotWriter {
    /// `interval` of 0 disables writing.
    pub fn new(dir: impl AsRef<Path>, interval: u64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            interval,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.interval > 0
    }

    /// Writes `<dir>/<scenario>/turn_NNNNNN.json` when the world's turn is a
    /// multiple of the interval.
    pub fn maybe_write(&self, world: &World, scenario: &str) -> Result<Option<PathBuf>> {
        if !self.is_enabled() || world.turn() % self.interval != 0 {
            return Ok(None);
        }
        let dir = self.dir.join(scenario);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot dir {}", dir.display()))?;
        let path = dir.join(format!("turn_{:06}.json", world.turn()));
        let file = SnapshotFile {
            generated_at: Utc::now(),
            snapshot: world.snapshot(scenario),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        debug!(path = %path.display(), "snapshot written");
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{components::{Biome, Tile}, hex::HexCoord};

    #[test]
    fn writes_only_on_interval_turns() {
        let temp = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(temp.path(), 2);
        let mut world = World::new(1.0);
        world.insert_tile(Tile::new(HexCoord::new(0, 0), Biome::Plains).with_population(3.0));

        world.advance_time();
        assert!(writer.maybe_write(&world, "demo").unwrap().is_none());
        world.advance_time();
        let path = writer.maybe_write(&world, "demo").unwrap().unwrap();
        assert!(path.ends_with("demo/turn_000002.json"));

        let text = fs::read_to_string(path).unwrap();
        let parsed: SnapshotFile = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.snapshot.turn, 2);
        assert_eq!(parsed.snapshot.unaffiliated_population, 3);
    }

    #[test]
    fn zero_interval_disables() {
        let temp = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(temp.path(), 0);
        let world = World::new(1.0);
        assert!(writer.maybe_write(&world, "demo").unwrap().is_none());
    }
}
