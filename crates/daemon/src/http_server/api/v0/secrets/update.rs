use axum::extract::{Json, Path, Query, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use common::prelude::Record;

use super::{PathQuery, RecordResponse, SecretsError};
use crate::http_server::api::auth::AuthUser;
use crate::http_server::api::encoding::decode_value;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub value: String,
    #[serde(default)]
    pub is_base64: bool,
}

/// Replace the value at `key`, creating it if needed
pub async fn handler(
    State(state): State<ServiceState>,
    AuthUser(username): AuthUser,
    Path(key): Path<String>,
    Query(query): Query<PathQuery>,
    Json(req): Json<UpdateRequest>,
) -> Result<impl IntoResponse, SecretsError> {
    let value = decode_value(&req.value, req.is_base64).map_err(|_| SecretsError::InvalidValue)?;
    let prefix = query.prefix(&username);

    let store = state.vault().store()?;
    store.set(&prefix, &key, &value).await?;
    tracing::debug!(prefix = %prefix, key = %key, "record updated");

    Ok((
        http::StatusCode::OK,
        Json(RecordResponse::from(Record { key, value })),
    ))
}
