//! Immutable point-in-time view of the model catalog.
//!
//! A [`CatalogSnapshot`] is built in one go from a full model list and never
//! mutated afterwards. Every refresh builds a new one, so readers holding an
//! `Arc<CatalogSnapshot>` always see a single generation.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use grid_core::catalog::{self, Capabilities, CatalogEntry, DEFAULT_BASELINE};
use grid_core::constraints::{self, GenerationParams, ModelConstraints, ParamCheck};
use serde::Serialize;

/// Tier a snapshot was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    Registry,
    Cache,
    Fallback,
}

impl SourceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTier::Registry => "registry",
            SourceTier::Cache => "cache",
            SourceTier::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    generation: u64,
    source: SourceTier,
    fetched_at: DateTime<Utc>,
    entries: HashMap<String, CatalogEntry>,
    /// Names with an accepted baseline.
    known: HashSet<String>,
    nsfw: HashSet<String>,
    controlnet: HashSet<String>,
    /// Lowercase name to canonical name, for known names only.
    aliases: HashMap<String, String>,
}

impl CatalogSnapshot {
    /// Build a snapshot and its derived sets from a complete model list.
    pub fn build(
        generation: u64,
        source: SourceTier,
        fetched_at: DateTime<Utc>,
        models: impl IntoIterator<Item = CatalogEntry>,
    ) -> Self {
        let mut entries = HashMap::new();
        let mut known = HashSet::new();
        let mut nsfw = HashSet::new();
        let mut controlnet = HashSet::new();
        let mut aliases = HashMap::new();

        for entry in models {
            let name = entry.name.clone();
            if catalog::is_accepted_baseline(&entry.baseline) {
                known.insert(name.clone());
                aliases.insert(name.to_lowercase(), name.clone());
            }
            if entry.nsfw {
                nsfw.insert(name.clone());
            }
            if entry.is_controlnet() {
                controlnet.insert(name.clone());
            }
            entries.insert(name, entry);
        }

        Self {
            generation,
            source,
            fetched_at,
            entries,
            known,
            nsfw,
            controlnet,
            aliases,
        }
    }

    /// Generation zero: no models at all.
    pub fn empty() -> Self {
        Self::build(0, SourceTier::Fallback, Utc::now(), Vec::new())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn source(&self) -> SourceTier {
        self.source
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Known model names, sorted.
    pub fn known_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.known.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn nsfw_names(&self) -> &HashSet<String> {
        &self.nsfw
    }

    pub fn controlnet_names(&self) -> &HashSet<String> {
        &self.controlnet
    }

    /// All entries, sorted by name.
    pub fn entries(&self) -> Vec<&CatalogEntry> {
        let mut all: Vec<&CatalogEntry> = self.entries.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    // ── Lookups ──────────────────────────────────────────────────────────

    /// Canonical name of a known model: exact match first, then
    /// case-insensitive.
    pub fn normalize_model_name(&self, name: &str) -> Option<&str> {
        if let Some(exact) = self.known.get(name) {
            return Some(exact.as_str());
        }
        self.aliases.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn is_known_model(&self, name: &str) -> bool {
        self.normalize_model_name(name).is_some()
    }

    /// Entry for `name`, resolving case for known models.
    pub fn entry(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name).or_else(|| {
            self.normalize_model_name(name)
                .and_then(|canonical| self.entries.get(canonical))
        })
    }

    /// Baseline of `name`. Unknown names use a `[SDXL]`/`[Flux]` tag when
    /// present, else the default baseline.
    pub fn baseline(&self, name: &str) -> &str {
        match self.entry(name) {
            Some(entry) if !entry.baseline.is_empty() => entry.baseline.as_str(),
            Some(_) => DEFAULT_BASELINE,
            None => catalog::baseline_hint(name).unwrap_or(DEFAULT_BASELINE),
        }
    }

    /// Distinct baselines of `names`; unknown names count as the default.
    pub fn all_model_baselines<S: AsRef<str>>(&self, names: &[S]) -> BTreeSet<String> {
        names
            .iter()
            .map(|n| match self.entry(n.as_ref()) {
                Some(entry) if !entry.baseline.is_empty() => entry.baseline.clone(),
                _ => DEFAULT_BASELINE.to_string(),
            })
            .collect()
    }

    /// Worker requirements of `name`; empty when unknown.
    pub fn requirements(&self, name: &str) -> serde_json::Map<String, serde_json::Value> {
        self.entry(name)
            .map(|e| e.requirements.clone())
            .unwrap_or_default()
    }

    /// Capability flags of `name`; all false when unknown.
    pub fn capabilities(&self, name: &str) -> Capabilities {
        self.entry(name)
            .map(CatalogEntry::capabilities)
            .unwrap_or_default()
    }

    pub fn constraints(&self, name: &str) -> Option<&ModelConstraints> {
        self.entry(name).and_then(|e| e.constraints.as_ref())
    }

    /// Whether any of `names` is unknown. An empty list has none.
    pub fn has_unknown_models<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().any(|n| !self.is_known_model(n.as_ref()))
    }

    /// Whether any of `names` is flagged nsfw.
    pub fn has_nsfw_models<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().any(|n| {
            let name = n.as_ref();
            self.nsfw.contains(name)
                || self
                    .normalize_model_name(name)
                    .is_some_and(|canonical| self.nsfw.contains(canonical))
        })
    }

    pub fn has_inpainting_models<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names
            .iter()
            .any(|n| self.entry(n.as_ref()).is_some_and(|e| e.inpainting))
    }

    /// Whether `names` is non-empty and every model supports inpainting.
    pub fn has_only_inpainting_models<S: AsRef<str>>(&self, names: &[S]) -> bool {
        !names.is_empty()
            && names
                .iter()
                .all(|n| self.entry(n.as_ref()).is_some_and(|e| e.inpainting))
    }

    pub fn is_video_model(&self, name: &str) -> bool {
        match self.entry(name) {
            Some(entry) => entry.is_video(),
            None => catalog::is_video_name(name),
        }
    }

    /// Validate generation parameters against the model's constraints.
    pub fn validate_params(&self, name: &str, params: &GenerationParams) -> ParamCheck {
        constraints::validate_params(self.constraints(name), params)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
