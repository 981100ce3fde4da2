use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use grid_core::catalog::ModelMedia;
use grid_registry::{
    FetchPolicy, ModelResolver, RegistryError, RegistryRecord, ResolverConfig, SnapshotFile,
    SourceTier, StaticRegistryClient,
};
use tokio_util::sync::CancellationToken;

fn config(dir: &Path) -> ResolverConfig {
    ResolverConfig {
        cache_path: dir.join("model_cache.json"),
        fetch: FetchPolicy::immediate(),
        ..ResolverConfig::default()
    }
}

fn image(name: &str) -> RegistryRecord {
    RegistryRecord::new(name, ModelMedia::Image)
}

fn generation_records(tag: u32) -> Vec<RegistryRecord> {
    ["a", "b", "c", "d", "e"]
        .iter()
        .map(|s| image(&format!("gen{tag}-{s}")))
        .collect()
}

#[tokio::test]
async fn live_refresh_publishes_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(StaticRegistryClient::new(vec![
        image("Deliberate"),
        RegistryRecord::new("wan2.2_ti2v_5B", ModelMedia::Video),
    ]));
    let resolver = ModelResolver::bootstrap(client, config(dir.path())).await.unwrap();

    let snapshot = resolver.snapshot();
    assert_eq!(snapshot.generation(), 1);
    assert_eq!(snapshot.source(), SourceTier::Registry);
    assert!(resolver.is_known_model("deliberate"));
    assert!(resolver.is_video_model("wan2.2_ti2v_5B"));
    assert_eq!(resolver.get_baseline("wan2.2_ti2v_5B"), "wan_2_2");

    let file = SnapshotFile::load(&dir.path().join("model_cache.json"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(file.models.len(), 2);
    assert!(file.models.contains_key("Deliberate"));
}

#[tokio::test]
async fn empty_registry_falls_back_to_persisted_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(StaticRegistryClient::new(generation_records(1)));
    let resolver = ModelResolver::bootstrap(client.clone(), config(dir.path()))
        .await
        .unwrap();
    let live_names: Vec<String> = resolver
        .snapshot()
        .known_names()
        .into_iter()
        .map(String::from)
        .collect();

    client.set_records(Vec::new());
    let report = resolver.refresh().await.unwrap();

    assert_eq!(report.source, SourceTier::Cache);
    assert_eq!(report.generation, 2);
    let cached_names: Vec<String> = resolver
        .snapshot()
        .known_names()
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(cached_names, live_names);
}

#[tokio::test]
async fn registry_outage_without_cache_uses_bundled_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(StaticRegistryClient::default());
    client.set_unavailable(true);

    let resolver = ModelResolver::bootstrap(client, config(dir.path())).await.unwrap();
    let snapshot = resolver.snapshot();

    assert_eq!(snapshot.source(), SourceTier::Fallback);
    assert!(!snapshot.is_empty());
    assert!(resolver.is_known_model("FLUX.1-dev"));
    assert!(!dir.path().join("model_cache.json").exists());
}

#[tokio::test]
async fn fallback_file_overrides_bundled_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let fallback = dir.path().join("fallback.json");
    tokio::fs::write(&fallback, r#"{"house_model": {"baseline": "flux_1"}}"#)
        .await
        .unwrap();

    let client = Arc::new(StaticRegistryClient::default());
    client.set_unavailable(true);
    let cfg = ResolverConfig {
        fallback_path: Some(fallback),
        ..config(dir.path())
    };

    let resolver = ModelResolver::bootstrap(client, cfg).await.unwrap();
    assert_eq!(resolver.snapshot().len(), 1);
    assert_eq!(resolver.get_baseline("HOUSE_MODEL"), "flux_1");
    assert!(!resolver.is_known_model("Deliberate"));
}

#[tokio::test]
async fn corrupt_snapshot_falls_through_to_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(StaticRegistryClient::new(generation_records(1)));
    let resolver = ModelResolver::bootstrap(client.clone(), config(dir.path()))
        .await
        .unwrap();

    tokio::fs::write(dir.path().join("model_cache.json"), "garbage")
        .await
        .unwrap();
    client.set_unavailable(true);
    let report = resolver.refresh().await.unwrap();
    assert_eq!(report.source, SourceTier::Fallback);
    assert_eq!(report.generation, 2);
}

#[tokio::test]
async fn malformed_record_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut broken = image("broken");
    broken.model_type = 9;
    let mut retired = image("retired");
    retired.active = false;

    let client = Arc::new(StaticRegistryClient::new(vec![
        image("Deliberate"),
        broken,
        retired,
        image("Realistic Vision"),
    ]));
    let resolver = ModelResolver::bootstrap(client, config(dir.path())).await.unwrap();

    let snapshot = resolver.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert!(!resolver.is_known_model("broken"));
    assert!(!resolver.is_known_model("retired"));
    assert!(resolver.is_known_model("realistic vision"));
}

#[tokio::test]
async fn rate_limited_record_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(StaticRegistryClient::new(vec![image("Deliberate")]));
    client.rate_limit(1, 2);

    let resolver = ModelResolver::bootstrap(client.clone(), config(dir.path()))
        .await
        .unwrap();
    assert!(resolver.is_known_model("Deliberate"));
    assert_eq!(client.get_calls(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn readers_never_observe_mixed_generations() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(StaticRegistryClient::new(generation_records(1)));
    let resolver = ModelResolver::bootstrap(client.clone(), config(dir.path()))
        .await
        .unwrap();

    let reader = {
        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move {
            for _ in 0..500 {
                let snapshot = resolver.snapshot();
                let names = snapshot.known_names();
                let prefix = names[0].split('-').next().unwrap_or_default().to_string();
                assert_eq!(names.len(), 5);
                assert!(names.iter().all(|n| n.starts_with(&format!("{prefix}-"))));
                tokio::task::yield_now().await;
            }
        })
    };

    for tag in 2..=20 {
        client.set_records(generation_records(tag));
        resolver.refresh().await.unwrap();
    }

    reader.await.unwrap();
    assert_eq!(resolver.snapshot().generation(), 20);
    assert!(resolver.is_known_model("gen20-a"));
}

#[tokio::test]
async fn refresher_runs_on_interval_until_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(StaticRegistryClient::new(generation_records(1)));
    let cfg = ResolverConfig {
        refresh_interval: Duration::from_millis(20),
        ..config(dir.path())
    };
    let resolver = ModelResolver::bootstrap(client.clone(), cfg).await.unwrap();

    let cancel = CancellationToken::new();
    let handle = resolver.spawn_refresher(cancel.clone());
    client.set_records(generation_records(2));

    let mut refreshed = false;
    for _ in 0..100 {
        if resolver.is_known_model("gen2-a") {
            refreshed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(refreshed);
    assert!(resolver.snapshot().generation() >= 2);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn unreachable_registry_reports_request_error() {
    let client = grid_registry::HttpRegistryClient::new("http://127.0.0.1:9", Duration::from_millis(200))
        .unwrap();
    let result = grid_registry::RegistryClient::count(&client).await;
    assert_matches!(result, Err(RegistryError::Request(_)));
}
