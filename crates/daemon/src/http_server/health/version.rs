use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

pub async fn handler() -> impl IntoResponse {
    (StatusCode::OK, Json(common::build_info!()))
}
