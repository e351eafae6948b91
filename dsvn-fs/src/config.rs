//! Filesystem configuration

use crate::error::{FsError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Configuration for opening a filesystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Directory of the fjall database (unused by in-memory filesystems)
    pub path: PathBuf,
    /// Node-revision records kept in the LRU cache
    pub node_cache_capacity: usize,
    /// Longest chain of deltas before a fulltext is stored again
    pub max_delta_chain: u32,
    /// zstd level for stored representations
    pub compression_level: i32,
    /// Sync the database to disk after every trail
    pub sync_writes: bool,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/fs"),
            node_cache_capacity: 1024,
            max_delta_chain: 16,
            compression_level: 3,
            sync_writes: true,
        }
    }
}

impl FsConfig {
    /// Default configuration rooted at `path`
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Load a JSON configuration file; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| FsError::Config(format!("cannot open {}: {}", path.display(), e)))?;
        let config: FsConfig = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| FsError::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .map_err(|e| FsError::Config(format!("cannot create {}: {}", path.display(), e)))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| FsError::Config(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| FsError::Config(e.to_string()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_cache_capacity == 0 {
            return Err(FsError::Config("node_cache_capacity must be positive".into()));
        }
        if !(1..=22).contains(&self.compression_level) {
            return Err(FsError::Config(format!(
                "compression_level {} outside 1..=22",
                self.compression_level
            )));
        }
        Ok(())
    }
}
