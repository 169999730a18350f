use axum::extract::{Json, Path, Query, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use super::{PathQuery, SecretsError};
use crate::http_server::api::auth::AuthUser;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Namespaces pruned because the delete left them empty
    pub deleted_buckets: usize,
}

pub async fn handler(
    State(state): State<ServiceState>,
    AuthUser(username): AuthUser,
    Path(key): Path<String>,
    Query(query): Query<PathQuery>,
) -> Result<impl IntoResponse, SecretsError> {
    let prefix = query.prefix(&username);

    let store = state.vault().store()?;
    let deleted_buckets = store.delete(&prefix, &key).await?;
    tracing::debug!(prefix = %prefix, key = %key, deleted_buckets, "record deleted");

    Ok((http::StatusCode::OK, Json(DeleteResponse { deleted_buckets })))
}
