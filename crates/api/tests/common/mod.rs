use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use grid_api::config::ServerConfig;
use grid_api::router::build_app_router;
use grid_api::state::AppState;
use grid_core::catalog::ModelMedia;
use grid_core::constraints::ModelConstraints;
use grid_core::job_kind::JobKind;
use grid_db::models::request::{CreateRequest, GenerationRequest};
use grid_db::models::worker::{CreateWorker, Worker};
use grid_db::MemoryStore;
use grid_events::Notifier;
use grid_lifecycle::{JobLifecycle, LifecycleConfig};
use grid_registry::{
    FetchPolicy, ModelResolver, RegistryRecord, ResolverConfig, StaticRegistryClient,
};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Test `ServerConfig` with the dev CORS origin.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
    }
}

/// The full router over an in-memory store and a static catalog.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    _dir: tempfile::TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();

        let mut flux = RegistryRecord::new("FLUX.1-dev", ModelMedia::Image);
        flux.base_model = "flux_1".into();
        flux.constraints = Some(ModelConstraints {
            steps_min: 4,
            steps_max: 50,
            cfg_min: 1.0,
            cfg_max: 5.0,
            samplers: vec!["k_euler".into()],
            ..ModelConstraints::default()
        });
        let mut inpaint = RegistryRecord::new("Inpaint XL", ModelMedia::Image);
        inpaint.inpainting = true;
        let records = vec![
            RegistryRecord::new("Deliberate", ModelMedia::Image),
            flux,
            inpaint,
            RegistryRecord::new("wan2.2_t2v", ModelMedia::Video),
        ];

        let resolver = ModelResolver::bootstrap(
            Arc::new(StaticRegistryClient::new(records)),
            ResolverConfig {
                cache_path: dir.path().join("model_cache.json"),
                fetch: FetchPolicy::immediate(),
                ..ResolverConfig::default()
            },
        )
        .await
        .unwrap();

        let store = Arc::new(MemoryStore::new());
        let lifecycle = Arc::new(JobLifecycle::new(
            store.clone(),
            Arc::clone(&resolver),
            Notifier::disabled(),
            LifecycleConfig { ttl_secs: 600 },
        ));

        let config = test_config();
        let state = AppState {
            pool: None,
            config: Arc::new(config.clone()),
            lifecycle,
            resolver,
        };

        Self {
            router: build_app_router(state, &config),
            store,
            _dir: dir,
        }
    }

    pub fn worker(&self, models: &[&str], owner_id: i64) -> Worker {
        self.store.add_worker(CreateWorker {
            name: "api-worker".into(),
            owner_id,
            models: models.iter().map(|s| s.to_string()).collect(),
            speed: 1.0,
            kudos_multiplier: 1.0,
        })
    }

    pub fn request(&self, models: &[&str], owner_id: i64) -> GenerationRequest {
        self.store.add_request(CreateRequest {
            owner_id,
            kind: JobKind::Image,
            models: models.iter().map(|s| s.to_string()).collect(),
            things: 20.0,
            kudos: 10.0,
            n: 4,
        })
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }
}
