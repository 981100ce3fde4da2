//! Model resolver: tiered refresh and atomic snapshot swap.
//!
//! Each refresh tries, in order, the live registry, the persisted snapshot
//! file and the fallback dataset, and stops at the first tier with at least
//! one model. Only a live success rewrites the snapshot file. The result is
//! published by swapping one `Arc<CatalogSnapshot>`; readers clone the `Arc`
//! under a read lock and never see a half-built catalog.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use grid_core::catalog::{Capabilities, CatalogEntry};
use grid_core::constraints::{GenerationParams, ParamCheck};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{self, RegistryClient};
use crate::config::ResolverConfig;
use crate::error::RegistryError;
use crate::snapshot::{CatalogSnapshot, SourceTier};
use crate::snapshot_file::{self, SnapshotFile};

/// Outcome of one refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshReport {
    pub generation: u64,
    pub source: SourceTier,
    pub models: usize,
}

pub struct ModelResolver {
    client: Arc<dyn RegistryClient>,
    config: ResolverConfig,
    current: RwLock<Arc<CatalogSnapshot>>,
    generation: AtomicU64,
    /// Serialises refreshes; never taken by readers.
    refreshing: tokio::sync::Mutex<()>,
}

impl ModelResolver {
    /// A resolver holding the empty generation-zero snapshot.
    pub fn new(client: Arc<dyn RegistryClient>, config: ResolverConfig) -> Self {
        Self {
            client,
            config,
            current: RwLock::new(Arc::new(CatalogSnapshot::empty())),
            generation: AtomicU64::new(0),
            refreshing: tokio::sync::Mutex::new(()),
        }
    }

    /// Build a resolver and complete its first refresh before returning.
    pub async fn bootstrap(
        client: Arc<dyn RegistryClient>,
        config: ResolverConfig,
    ) -> Result<Arc<Self>, RegistryError> {
        let resolver = Self::new(client, config);
        let report = resolver.refresh().await?;
        tracing::info!(
            generation = report.generation,
            source = report.source.as_str(),
            models = report.models,
            "Model catalog ready"
        );
        Ok(Arc::new(resolver))
    }

    /// Current snapshot. Cheap; no I/O.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    // ── Refresh ──────────────────────────────────────────────────────────

    /// Rebuild the catalog from the first non-empty tier and publish it.
    ///
    /// Fails only when every tier is empty or unreadable; the previous
    /// snapshot then stays in place.
    pub async fn refresh(&self) -> Result<RefreshReport, RegistryError> {
        let _guard = self.refreshing.lock().await;

        let (source, fetched_at, models) = if let Some(models) = self.live_tier().await {
            let fetched_at = Utc::now();
            self.persist(&models, fetched_at).await;
            (SourceTier::Registry, fetched_at, models)
        } else if let Some(file) = self.cache_tier().await {
            (SourceTier::Cache, file.fetched_at, file.models.into_values().collect())
        } else {
            let models = self.fallback_tier().await?;
            (SourceTier::Fallback, Utc::now(), models)
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(CatalogSnapshot::build(generation, source, fetched_at, models));
        let report = RefreshReport {
            generation,
            source,
            models: snapshot.len(),
        };

        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = snapshot;

        Ok(report)
    }

    async fn live_tier(&self) -> Option<Vec<CatalogEntry>> {
        match client::fetch_catalog(self.client.as_ref(), &self.config.fetch).await {
            Ok(models) if models.is_empty() => {
                tracing::warn!("Registry returned no active models, falling back");
                None
            }
            Ok(models) => Some(models),
            Err(e) => {
                tracing::warn!(error = %e, "Registry unavailable, falling back");
                None
            }
        }
    }

    async fn cache_tier(&self) -> Option<SnapshotFile> {
        match SnapshotFile::load(&self.config.cache_path).await {
            Ok(Some(file)) if !file.models.is_empty() => Some(file),
            Ok(_) => {
                tracing::debug!(path = %self.config.cache_path.display(), "No usable model snapshot");
                None
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.config.cache_path.display(),
                    error = %e,
                    "Failed to read model snapshot"
                );
                None
            }
        }
    }

    async fn fallback_tier(&self) -> Result<Vec<CatalogEntry>, RegistryError> {
        if let Some(path) = &self.config.fallback_path {
            match snapshot_file::load_models_file(path).await {
                Ok(models) if !models.is_empty() => return Ok(models.into_values().collect()),
                Ok(_) => tracing::warn!(path = %path.display(), "Fallback file is empty"),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to read fallback file")
                }
            }
        }

        let models = snapshot_file::bundled_models()?;
        if models.is_empty() {
            return Err(RegistryError::NoCatalog);
        }
        tracing::warn!(models = models.len(), "Using bundled model dataset");
        Ok(models.into_values().collect())
    }

    async fn persist(&self, models: &[CatalogEntry], fetched_at: chrono::DateTime<Utc>) {
        let file = SnapshotFile::new(
            self.config.registry_address.clone(),
            fetched_at,
            models.iter().cloned(),
        );
        if let Err(e) = file.save(&self.config.cache_path).await {
            tracing::warn!(
                path = %self.config.cache_path.display(),
                error = %e,
                "Failed to persist model snapshot"
            );
        }
    }

    /// Refresh every `refresh_interval` until `cancel` fires. The first
    /// refresh happens one interval from now.
    pub fn spawn_refresher(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let resolver = Arc::clone(self);
        tokio::spawn(async move {
            let period = resolver.config.refresh_interval;
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            tracing::info!(interval_secs = period.as_secs(), "Model refresher started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("Model refresher stopping");
                        break;
                    }
                    _ = interval.tick() => {
                        match resolver.refresh().await {
                            Ok(report) => tracing::info!(
                                generation = report.generation,
                                source = report.source.as_str(),
                                models = report.models,
                                "Model catalog refreshed"
                            ),
                            Err(e) => tracing::error!(error = %e, "Model catalog refresh failed"),
                        }
                    }
                }
            }
        })
    }

    // ── Lookups ──────────────────────────────────────────────────────────

    pub fn is_known_model(&self, name: &str) -> bool {
        self.snapshot().is_known_model(name)
    }

    pub fn normalize_model_name(&self, name: &str) -> Option<String> {
        self.snapshot().normalize_model_name(name).map(str::to_string)
    }

    pub fn get_baseline(&self, name: &str) -> String {
        self.snapshot().baseline(name).to_string()
    }

    pub fn get_all_model_baselines<S: AsRef<str>>(&self, names: &[S]) -> BTreeSet<String> {
        self.snapshot().all_model_baselines(names)
    }

    pub fn get_requirements(&self, name: &str) -> serde_json::Map<String, serde_json::Value> {
        self.snapshot().requirements(name)
    }

    pub fn get_capabilities(&self, name: &str) -> Capabilities {
        self.snapshot().capabilities(name)
    }

    pub fn has_unknown_models<S: AsRef<str>>(&self, names: &[S]) -> bool {
        self.snapshot().has_unknown_models(names)
    }

    pub fn has_nsfw_models<S: AsRef<str>>(&self, names: &[S]) -> bool {
        self.snapshot().has_nsfw_models(names)
    }

    pub fn has_inpainting_models<S: AsRef<str>>(&self, names: &[S]) -> bool {
        self.snapshot().has_inpainting_models(names)
    }

    pub fn has_only_inpainting_models<S: AsRef<str>>(&self, names: &[S]) -> bool {
        self.snapshot().has_only_inpainting_models(names)
    }

    pub fn is_video_model(&self, name: &str) -> bool {
        self.snapshot().is_video_model(name)
    }

    pub fn validate_params(&self, name: &str, params: &GenerationParams) -> ParamCheck {
        self.snapshot().validate_params(name, params)
    }
}
