//! REST API handlers for orofacial-server.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use orofacial_core::catalog::draft_from_value;
use orofacial_core::{ImportMode, OrofacialError};

use crate::state::AppState;

// ─── Router ──────────────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", get(list_sessions))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/stats", get(get_stats))
        .route("/exercises", get(list_exercises).post(create_exercise))
        .route("/exercises/validate", post(validate_exercise))
        .route("/exercises/export", get(export_exercises))
        .route("/exercises/import", post(import_exercises))
        .route(
            "/exercises/{id}",
            get(get_exercise).put(update_exercise).delete(delete_exercise),
        )
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

fn core_error_response(err: OrofacialError) -> Response {
    match err {
        OrofacialError::InvalidExercise(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "error": "invalid exercise",
                "errors": errors,
            })),
        )
            .into_response(),
        OrofacialError::ExerciseNotFound(_) | OrofacialError::SessionNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, err.to_string())
        }
        OrofacialError::InvalidImport(_) | OrofacialError::EmptyImport => {
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
        other => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

// ─── Sessions ────────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Deserialize, Default)]
struct SessionsQuery {
    /// Only sessions started from this exercise.
    exercise: Option<String>,
}

async fn list_sessions(
    State(state): State<AppState>,
    Query(q): Query<SessionsQuery>,
) -> impl IntoResponse {
    let sessions = state.sessions.lock().await;
    let list = match q.exercise {
        Some(exercise_id) => sessions.sessions_by_exercise(&exercise_id),
        None => sessions.all_sessions(),
    };
    Json(list)
}

async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let session = state.sessions.lock().await.session_by_id(&id);
    match session {
        Some(session) => Json(session).into_response(),
        None => core_error_response(OrofacialError::SessionNotFound(id)),
    }
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if state.sessions.lock().await.delete_session(&id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        core_error_response(OrofacialError::SessionNotFound(id))
    }
}

async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.sessions.lock().await.stats())
}

// ─── Exercises ───────────────────────────────────────────────────────────────

async fn list_exercises(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.catalog.lock().await.list())
}

async fn get_exercise(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let exercise = state.catalog.lock().await.get(&id);
    match exercise {
        Some(exercise) => Json(exercise).into_response(),
        None => core_error_response(OrofacialError::ExerciseNotFound(id)),
    }
}

async fn create_exercise(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Response {
    match state.catalog.lock().await.create(draft_from_value(&body)) {
        Ok(exercise) => (StatusCode::CREATED, Json(exercise)).into_response(),
        Err(e) => core_error_response(e),
    }
}

async fn update_exercise(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    match state.catalog.lock().await.update(&id, draft_from_value(&body)) {
        Ok(exercise) => Json(exercise).into_response(),
        Err(e) => core_error_response(e),
    }
}

async fn delete_exercise(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if state.catalog.lock().await.delete(&id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        core_error_response(OrofacialError::ExerciseNotFound(id))
    }
}

async fn validate_exercise(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    // Loosely typed so every bad field is reported, not just the first.
    Json(state.catalog.lock().await.validate(&draft_from_value(&body)))
}

async fn export_exercises(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.catalog.lock().await.export())
}

#[derive(Deserialize)]
struct ImportQuery {
    mode: ImportMode,
}

async fn import_exercises(
    State(state): State<AppState>,
    Query(q): Query<ImportQuery>,
    body: String,
) -> Response {
    match state.catalog.lock().await.import_json(&body, q.mode) {
        Ok(added) => Json(serde_json::json!({ "imported": added })).into_response(),
        Err(e) => {
            warn!("Exercise import rejected: {}", e);
            core_error_response(e)
        }
    }
}
