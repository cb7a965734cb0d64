//! API tests for orofacial-server.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use orofacial_core::catalog::NoBundle;
use orofacial_core::{
    ExerciseCatalog, FacialMetrics, ManualTimeSource, MemoryStore, SessionStore,
};
use orofacial_server::{build_router, AppState};

struct Fixture {
    app: Router,
    state: AppState,
    time: Arc<ManualTimeSource>,
}

fn fixture() -> Fixture {
    let time = Arc::new(ManualTimeSource::default());
    let store = Arc::new(MemoryStore::new());
    let state = AppState::open(store, &NoBundle, time.clone());
    Fixture {
        app: build_router(state.clone()),
        state,
        time,
    }
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<String>) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

async fn record_session(fx: &Fixture, exercise_id: &str, elapsed_ms: i64) -> String {
    let exercise = fx.state.catalog.lock().await.get(exercise_id).unwrap();
    let mut sessions = fx.state.sessions.lock().await;
    sessions.start_session(&exercise).unwrap();
    sessions.record_sample(&FacialMetrics {
        mouth_opening: 42.0,
        ..Default::default()
    });
    fx.time.advance_ms(elapsed_ms);
    sessions.stop_session().unwrap().id
}

#[tokio::test]
async fn test_health() {
    let fx = fixture();
    let (status, body) = send(&fx.app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_sessions_list_filter_and_stats() {
    let fx = fixture();
    let first = record_session(&fx, "default-mouth-opening", 60_000).await;
    record_session(&fx, "default-combined", 30_000).await;

    let (status, body) = send(&fx.app, "GET", "/api/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["exerciseId"], "default-combined");

    let (_, body) = send(
        &fx.app,
        "GET",
        "/api/sessions?exercise=default-mouth-opening",
        None,
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], first.as_str());
    assert_eq!(body[0]["status"], "completed");
    assert_eq!(body[0]["metrics"]["avgMouthOpening"], 42.0);

    let (_, stats) = send(&fx.app, "GET", "/api/stats", None).await;
    assert_eq!(stats["totalSessions"], 2);
    assert_eq!(stats["completedSessions"], 1);
    assert_eq!(stats["avgCompletionRate"], 50);
    assert_eq!(stats["totalTimeMinutes"], 2);
}

#[tokio::test]
async fn test_get_and_delete_session() {
    let fx = fixture();
    let id = record_session(&fx, "default-mouth-opening", 10_000).await;

    let (status, body) = send(&fx.app, "GET", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "incomplete");

    let (status, _) = send(&fx.app, "DELETE", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&fx.app, "DELETE", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains(&id));
}

#[tokio::test]
async fn test_exercise_crud() {
    let fx = fixture();
    let (status, created) = send(
        &fx.app,
        "POST",
        "/api/exercises",
        Some(r#"{"name":"Tongue lift","duration":45,"type":"combined"}"#.into()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &fx.app,
        "PUT",
        &format!("/api/exercises/{id}"),
        Some(r#"{"name":"Tongue lift","duration":90,"type":"combined"}"#.into()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["duration"], 90);
    assert!(updated.get("updatedAt").is_some());

    let (_, list) = send(&fx.app, "GET", "/api/exercises", None).await;
    assert_eq!(list.as_array().unwrap().len(), 4);

    let (status, _) = send(&fx.app, "DELETE", &format!("/api/exercises/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&fx.app, "GET", &format!("/api/exercises/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_exercise_reports_all_errors() {
    let fx = fixture();
    let draft = r#"{"name":"","duration":5,"type":""}"#;

    let (status, body) = send(&fx.app, "POST", "/api/exercises/validate", Some(draft.into())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isValid"], false);
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);

    let (status, body) = send(&fx.app, "POST", "/api/exercises", Some(draft.into())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_mistyped_exercise_fields_are_validation_errors() {
    let fx = fixture();
    let draft = r#"{"name":"a","duration":-5,"type":"chewing"}"#;

    let (status, body) = send(&fx.app, "POST", "/api/exercises/validate", Some(draft.into())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isValid"], false);
    assert_eq!(
        body["errors"],
        serde_json::json!([
            "Duration must be at least 10 seconds",
            "Exercise type is required"
        ])
    );

    let (status, body) = send(
        &fx.app,
        "PUT",
        "/api/exercises/default-combined",
        Some(r#"{"name":"Renamed","duration":"60","type":"combined"}"#.into()),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_export_import_roundtrip() {
    let fx = fixture();
    let (status, exported) = send(&fx.app, "GET", "/api/exercises/export", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(exported["version"], "1.0");

    let other = fixture();
    let (status, _) = send(
        &other.app,
        "DELETE",
        "/api/exercises/default-combined",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &other.app,
        "POST",
        "/api/exercises/import?mode=replace",
        Some(exported.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["imported"], 3);

    let (_, original) = send(&fx.app, "GET", "/api/exercises", None).await;
    let (_, imported) = send(&other.app, "GET", "/api/exercises", None).await;
    assert_eq!(original, imported);
}

#[tokio::test]
async fn test_import_requires_mode_and_valid_content() {
    let fx = fixture();
    let (status, _) = send(
        &fx.app,
        "POST",
        "/api/exercises/import",
        Some(r#"{"exercises":[]}"#.into()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &fx.app,
        "POST",
        "/api/exercises/import?mode=merge",
        Some(r#"{"exercises":[{"name":"no duration"}]}"#.into()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("no valid exercises"));
}

#[tokio::test]
async fn test_sessions_unaffected_by_unknown_routes() {
    let fx = fixture();
    let (status, _) = send(&fx.app, "GET", "/api/sessions/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let session_count = SessionStore::all_sessions(&*fx.state.sessions.lock().await).len();
    assert_eq!(session_count, 0);
    let catalog_len = ExerciseCatalog::list(&*fx.state.catalog.lock().await).len();
    assert_eq!(catalog_len, 3);
}
