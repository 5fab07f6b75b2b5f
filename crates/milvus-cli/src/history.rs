//! Saved connections (`connections.json`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::Result;

/// One saved connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedConnection {
    /// Server URI.
    pub uri: String,
    /// Token, stored as given.
    #[serde(default)]
    pub token: Option<String>,
    /// TLS level: 0, 1 or 2.
    #[serde(default)]
    pub tls: u8,
    /// CA certificate path.
    #[serde(default)]
    pub cert_path: Option<PathBuf>,
    /// Database selected on connect.
    #[serde(default)]
    pub db_name: Option<String>,
    /// Last time the alias was used.
    pub last_used: DateTime<Utc>,
}

/// Saved connections keyed by alias.
#[derive(Debug, Default)]
pub struct ConnectionHistory {
    path: Option<PathBuf>,
    entries: BTreeMap<String, SavedConnection>,
}

impl ConnectionHistory {
    /// History that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the history file. A missing or corrupt file yields an empty history.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring corrupt connection history");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read connection history");
                BTreeMap::new()
            }
        };
        Self {
            path: Some(path.to_path_buf()),
            entries,
        }
    }

    /// Writes the history back; no-op for an in-memory history.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Adds or replaces an alias.
    pub fn record(&mut self, alias: &str, entry: SavedConnection) {
        self.entries.insert(alias.to_string(), entry);
    }

    /// Updates the last-used timestamp of an alias.
    pub fn touch(&mut self, alias: &str) {
        if let Some(entry) = self.entries.get_mut(alias) {
            entry.last_used = Utc::now();
        }
    }

    /// Looks up an alias.
    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&SavedConnection> {
        self.entries.get(alias)
    }

    /// Removes an alias; returns false when it was not saved.
    pub fn remove(&mut self, alias: &str) -> bool {
        self.entries.remove(alias).is_some()
    }

    /// Returns true when the alias is saved.
    #[must_use]
    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    /// Entries sorted by alias.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &SavedConnection)> {
        self.entries.iter()
    }

    /// Number of saved aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is saved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
