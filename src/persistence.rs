use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PersistenceError;
use crate::models::GameRecord;

/// Writes one `.pgn` file per game, rewritten after every move.
pub struct PgnStore {
    directory: PathBuf,
}

impl PgnStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the written path, or `None` for a game with no moves yet.
    pub fn save(&self, record: &GameRecord) -> Result<Option<PathBuf>, PersistenceError> {
        let Some(name) = record.file_name() else {
            return Ok(None);
        };
        let path = self.directory.join(name);
        fs::create_dir_all(&self.directory).map_err(|source| PersistenceError {
            path: self.directory.clone(),
            source,
        })?;
        fs::write(&path, &record.pgn_text).map_err(|source| PersistenceError {
            path: path.clone(),
            source,
        })?;
        debug!("game saved to {}", path.display());
        Ok(Some(path))
    }
}
