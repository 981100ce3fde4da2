//! On-disk catalog documents: the persisted snapshot and the fallback set.
//!
//! The snapshot file is overwritten wholesale after every successful live
//! refresh (write to a sibling temp file, then rename). The fallback dataset
//! has the same shape as the snapshot's `models` map and is bundled into the
//! binary, optionally overridden by a file on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use grid_core::catalog::CatalogEntry;
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;

/// Bundled fallback dataset.
const BUNDLED_MODELS: &str = include_str!("../data/fallback_models.json");

/// Source identifier written into snapshot files.
pub const SNAPSHOT_SOURCE: &str = "registry";

/// Persisted result of the last successful live refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub fetched_at: DateTime<Utc>,
    pub source: String,
    pub registry_address: String,
    pub models: BTreeMap<String, CatalogEntry>,
}

impl SnapshotFile {
    pub fn new(
        registry_address: impl Into<String>,
        fetched_at: DateTime<Utc>,
        entries: impl IntoIterator<Item = CatalogEntry>,
    ) -> Self {
        Self {
            fetched_at,
            source: SNAPSHOT_SOURCE.to_string(),
            registry_address: registry_address.into(),
            models: entries.into_iter().map(|e| (e.name.clone(), e)).collect(),
        }
    }

    /// Read a snapshot. A missing file is `Ok(None)`.
    pub async fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the file at `path` with this snapshot.
    pub async fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let text = serde_json::to_string_pretty(self)?;
        let tmp = temp_path(path);
        tokio::fs::write(&tmp, text).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Parse a models map (display name to entry).
///
/// Entries stored without a `name` take their key.
pub fn parse_models(text: &str) -> Result<BTreeMap<String, CatalogEntry>, SnapshotError> {
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(text)?;
    let mut models = BTreeMap::new();
    for (key, mut value) in raw {
        if let Some(obj) = value.as_object_mut() {
            obj.entry("name")
                .or_insert_with(|| serde_json::Value::String(key.clone()));
        }
        let entry: CatalogEntry = serde_json::from_value(value)?;
        models.insert(key, entry);
    }
    Ok(models)
}

/// The dataset shipped with the binary.
pub fn bundled_models() -> Result<BTreeMap<String, CatalogEntry>, SnapshotError> {
    parse_models(BUNDLED_MODELS)
}

/// A fallback dataset read from disk.
pub async fn load_models_file(path: &Path) -> Result<BTreeMap<String, CatalogEntry>, SnapshotError> {
    let text = tokio::fs::read_to_string(path).await?;
    parse_models(&text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
