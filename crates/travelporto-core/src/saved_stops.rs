//! The user's saved stops, persisted as JSON under the config directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::Stop;

pub struct SavedStops {
    path: PathBuf,
    stops: Vec<Stop>,
}

impl SavedStops {
    /// Load the saved stops at `path`.
    ///
    /// A missing or unreadable file yields an empty list. Entries that do not
    /// have the shape of a stop are dropped; the rest are kept.
    pub fn load(path: PathBuf) -> Self {
        let stops = match Self::read(&path) {
            Ok(stops) => stops,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable saved stops");
                Vec::new()
            }
        };
        Self { path, stops }
    }

    fn read(path: &Path) -> Result<Vec<Stop>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read saved stops: {}", path.display()))?;
        let parsed: Value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse saved stops: {}", path.display()))?;

        let Value::Array(entries) = parsed else {
            anyhow::bail!("Saved stops file is not a list");
        };
        let total = entries.len();
        let stops: Vec<Stop> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();
        if stops.len() < total {
            debug!(dropped = total - stops.len(), "Dropped malformed saved stop entries");
        }
        Ok(stops)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.stops)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write saved stops: {}", self.path.display()))?;
        Ok(())
    }

    /// Add `stop` unless a stop with the same id is already saved.
    pub fn add(&mut self, stop: Stop) -> bool {
        if self.contains(&stop.id) {
            return false;
        }
        self.stops.push(stop);
        true
    }

    pub fn remove(&mut self, stop_id: &str) -> bool {
        let before = self.stops.len();
        self.stops.retain(|s| s.id != stop_id);
        self.stops.len() != before
    }

    pub fn contains(&self, stop_id: &str) -> bool {
        self.stops.iter().any(|s| s.id == stop_id)
    }

    pub fn list(&self) -> &[Stop] {
        &self.stops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::stop;

    fn temp_path() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("saved_stops.json");
        (dir, path)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (_dir, path) = temp_path();
        assert!(SavedStops::load(path).list().is_empty());
    }

    #[test]
    fn test_add_remove_and_persist() {
        let (_dir, path) = temp_path();
        let mut saved = SavedStops::load(path.clone());

        assert!(saved.add(stop("BLM1", "Bolhão")));
        assert!(saved.add(stop("TRD3", "Trindade")));
        assert!(!saved.add(stop("BLM1", "Bolhão again")));
        assert!(saved.remove("TRD3"));
        assert!(!saved.remove("TRD3"));
        saved.save().unwrap();

        let reloaded = SavedStops::load(path);
        assert_eq!(reloaded.list().len(), 1);
        assert_eq!(reloaded.list()[0].name, "Bolhão");
        assert!(reloaded.contains("BLM1"));
    }

    #[test]
    fn test_malformed_entries_are_dropped() {
        let (_dir, path) = temp_path();
        std::fs::write(
            &path,
            r#"[
                {"id":"BLM1","name":"Bolhão","coordinates":{"latitude":41.1,"longitude":-8.6},"zone_id":"PRT1"},
                {"id":"X","name":"No coordinates","zone_id":"PRT1"},
                {"id":7,"name":"Numeric id","coordinates":{"latitude":41.1,"longitude":-8.6},"zone_id":"PRT1"},
                null
            ]"#,
        )
        .unwrap();

        let saved = SavedStops::load(path);
        assert_eq!(saved.list().len(), 1);
        assert_eq!(saved.list()[0].id, "BLM1");
    }

    #[test]
    fn test_malformed_file_is_empty() {
        let (_dir, path) = temp_path();
        std::fs::write(&path, "{not json").unwrap();
        assert!(SavedStops::load(path.clone()).list().is_empty());

        std::fs::write(&path, r#"{"id":"BLM1"}"#).unwrap();
        assert!(SavedStops::load(path).list().is_empty());
    }
}
