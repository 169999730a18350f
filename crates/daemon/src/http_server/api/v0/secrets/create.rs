use axum::extract::{Json, Query, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use super::{PathQuery, SecretsError};
use crate::http_server::api::auth::AuthUser;
use crate::http_server::api::encoding::decode_value;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub is_base64: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResponse {
    pub key: String,
    pub path: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    AuthUser(username): AuthUser,
    Query(query): Query<PathQuery>,
    Json(req): Json<CreateRequest>,
) -> Result<impl IntoResponse, SecretsError> {
    let value = decode_value(&req.value, req.is_base64).map_err(|_| SecretsError::InvalidValue)?;
    let prefix = query.prefix(&username);

    let store = state.vault().store()?;
    store.set(&prefix, &req.key, &value).await?;
    tracing::debug!(prefix = %prefix, key = %req.key, "record stored");

    Ok((
        http::StatusCode::CREATED,
        Json(CreateResponse {
            key: req.key,
            path: prefix.segments().join("/"),
        }),
    ))
}
