//! Persistence of the current dial position between restarts.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("position file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("position file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
struct Slot {
    position: i32,
}

/// Durable slot holding the last committed position, rewritten after every
/// transition so an abrupt power-off resumes where the dial stood.
#[derive(Debug)]
pub struct PositionStore {
    path: PathBuf,
    default: i32,
}

impl PositionStore {
    pub fn new(path: impl Into<PathBuf>, default: i32) -> PositionStore {
        PositionStore {
            path: path.into(),
            default,
        }
    }

    /// Last saved position, or the default when no slot exists yet. A slot
    /// that exists but does not parse is an error, not a default.
    pub fn load(&self) -> Result<i32, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(self.default),
            Err(err) => return Err(StoreError::Io(err)),
        };
        let slot: Slot = serde_json::from_reader(BufReader::new(file))?;
        Ok(slot.position)
    }

    /// Overwrite the slot. Writes a sibling temp file and renames it over the
    /// target, so a crash mid-write never leaves a torn slot behind.
    pub fn save(&self, position: i32) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("tmp");
        let file = File::create(&tmp)?;
        serde_json::to_writer(&file, &Slot { position })?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
