// Place name -> coordinates cache persisted as a pretty-printed JSON object.

use crate::ir::Coordinates;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to write location cache {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode location cache")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationCache {
    entries: BTreeMap<String, Coordinates>,
    dirty: bool,
}

impl LocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache file. A missing, unreadable or malformed file yields an
    /// empty cache.
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no location cache found, starting empty");
                return Self::new();
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot read location cache, starting empty");
                return Self::new();
            }
        };
        match serde_json::from_str::<BTreeMap<String, Coordinates>>(&contents) {
            Ok(entries) => {
                info!(path = %path.display(), entries = entries.len(), "location cache loaded");
                Self {
                    entries,
                    dirty: false,
                }
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "malformed location cache, starting empty");
                Self::new()
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Coordinates> {
        self.entries.get(name).copied()
    }

    pub fn insert(&mut self, name: impl Into<String>, coordinates: Coordinates) {
        let name = name.into();
        if self.entries.get(&name) != Some(&coordinates) {
            self.entries.insert(name, coordinates);
            self.dirty = true;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when entries changed since loading.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Serialize with sorted keys, 4-space indentation and literal non-ASCII.
    pub fn to_json(&self) -> Result<String, CacheError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.entries.serialize(&mut ser)?;
        // serde_json only emits valid UTF-8.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn save(&mut self, path: &Path) -> Result<(), CacheError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| CacheError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        self.dirty = false;
        info!(path = %path.display(), entries = self.entries.len(), "location cache saved");
        Ok(())
    }
}
