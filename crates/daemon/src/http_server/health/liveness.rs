use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

/// The process is up; says nothing about the seal state
pub async fn handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}
