mod common;

use axum::http::StatusCode;
use common::TestApp;
use grid_db::JobStore;
use serde_json::json;
use uuid::Uuid;

const WORKER_OWNER: i64 = 1;
const REQUEST_OWNER: i64 = 2;

async fn create(app: &TestApp, models: &[&str]) -> (StatusCode, serde_json::Value) {
    let worker = app.worker(models, WORKER_OWNER);
    let request = app.request(models, REQUEST_OWNER);
    app.post_json(
        "/api/v1/jobs",
        json!({ "request_id": request.id, "worker_id": worker.id }),
    )
    .await
}

fn job_path(json: &serde_json::Value, suffix: &str) -> String {
    format!("/api/v1/jobs/{}{suffix}", json["data"]["id"].as_str().unwrap())
}

#[tokio::test]
async fn create_returns_processing_job() {
    let app = TestApp::new().await;

    let (status, json) = create(&app, &["Deliberate"]).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["status"], "processing");
    assert_eq!(json["data"]["model"], "Deliberate");
    assert_eq!(json["data"]["progress_percent"], 0);
}

#[tokio::test]
async fn explicit_model_is_canonicalised() {
    let app = TestApp::new().await;
    let worker = app.worker(&["FLUX.1-dev"], WORKER_OWNER);
    let request = app.request(&[], REQUEST_OWNER);

    let (status, json) = app
        .post_json(
            "/api/v1/jobs",
            json!({ "request_id": request.id, "worker_id": worker.id, "model": "flux.1-DEV" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["model"], "FLUX.1-dev");
}

#[tokio::test]
async fn unknown_model_is_rejected() {
    let app = TestApp::new().await;
    let worker = app.worker(&["Deliberate"], WORKER_OWNER);
    let request = app.request(&[], REQUEST_OWNER);

    let (status, json) = app
        .post_json(
            "/api/v1/jobs",
            json!({ "request_id": request.id, "worker_id": worker.id, "model": "Mystery" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "UNKNOWN_MODEL");
    assert_eq!(json["error"], "Unknown model requested: Mystery");
    assert_eq!(app.store.job_count(), 0);
}

#[tokio::test]
async fn worker_without_models_is_rejected() {
    let app = TestApp::new().await;

    let (status, json) = create(&app, &[]).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "NO_MODELS");
}

#[tokio::test]
async fn missing_job_is_404() {
    let app = TestApp::new().await;

    let (status, json) = app
        .get(&format!("/api/v1/jobs/{}", Uuid::new_v4()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn result_applies_once() {
    let app = TestApp::new().await;
    let (_, job) = create(&app, &["Deliberate"]).await;
    let body = json!({ "payload": "https://storage/1.webp", "things_per_sec": 2.0 });

    let (status, first) = app.post_json(&job_path(&job, "/result"), body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["outcome"], "applied");
    assert!(first["data"]["reward"].as_f64().unwrap() > 0.0);

    let (status, second) = app.post_json(&job_path(&job, "/result"), body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["outcome"], "already_terminal");
    assert_eq!(second["data"]["state"], "completed");

    let (_, details) = app.get(&job_path(&job, "")).await;
    assert_eq!(details["data"]["status"], "completed");
}

#[tokio::test]
async fn abort_gives_no_reward_and_blocks_result() {
    let app = TestApp::new().await;
    let (_, job) = create(&app, &["Deliberate"]).await;

    let (status, aborted) = app
        .post_json(&job_path(&job, "/abort"), json!({ "reason": "worker crashed" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(aborted["data"]["outcome"], "applied");
    assert_eq!(aborted["data"]["reward"], 0.0);

    let (_, result) = app
        .post_json(&job_path(&job, "/result"), json!({ "payload": "late" }))
        .await;
    assert_eq!(result["data"]["outcome"], "already_terminal");
    assert_eq!(result["data"]["state"], "faulted");
}

#[tokio::test]
async fn abort_requires_a_reason() {
    let app = TestApp::new().await;
    let (_, job) = create(&app, &["Deliberate"]).await;

    let (status, _) = app
        .post_json(&job_path(&job, "/abort"), json!({ "reason": "" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancel_marks_job_cancelled() {
    let app = TestApp::new().await;
    let (_, job) = create(&app, &["Deliberate"]).await;

    let (status, cancelled) = app.post_json(&job_path(&job, "/cancel"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["data"]["outcome"], "applied");

    let (_, details) = app.get(&job_path(&job, "")).await;
    assert_eq!(details["data"]["status"], "cancelled");
}

#[tokio::test]
async fn progress_updates_until_terminal() {
    let app = TestApp::new().await;
    let (_, job) = create(&app, &["Deliberate"]).await;

    let (_, ack) = app
        .post_json(
            &job_path(&job, "/progress"),
            json!({ "current_step": 5, "total_steps": 20 }),
        )
        .await;
    assert_eq!(ack["data"]["updated"], true);

    let (_, details) = app.get(&job_path(&job, "")).await;
    assert_eq!(details["data"]["progress_percent"], 25);

    app.post_json(&job_path(&job, "/cancel"), json!({})).await;
    let (_, ack) = app
        .post_json(
            &job_path(&job, "/progress"),
            json!({ "current_step": 10, "total_steps": 20 }),
        )
        .await;
    assert_eq!(ack["data"]["updated"], false);
}

#[tokio::test]
async fn store_outage_is_503_and_leaves_job_open() {
    let app = TestApp::new().await;
    let (_, job) = create(&app, &["Deliberate"]).await;
    let id: Uuid = job["data"]["id"].as_str().unwrap().parse().unwrap();

    app.store.set_unavailable(true);
    let (status, json) = app
        .post_json(&job_path(&job, "/result"), json!({ "payload": "x" }))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "STORE_UNAVAILABLE");

    app.store.set_unavailable(false);
    let stored = app.store.find_job(id).await.unwrap().unwrap();
    assert!(!stored.is_terminal());
}
