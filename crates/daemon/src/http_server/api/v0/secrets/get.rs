use axum::extract::{Json, Path, Query, State};
use axum::response::IntoResponse;

use common::prelude::Record;

use super::{PathQuery, RecordResponse, SecretsError};
use crate::http_server::api::auth::AuthUser;
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    AuthUser(username): AuthUser,
    Path(key): Path<String>,
    Query(query): Query<PathQuery>,
) -> Result<impl IntoResponse, SecretsError> {
    let prefix = query.prefix(&username);

    let store = state.vault().store()?;
    let value = store.get(&prefix, &key).await?;

    Ok((
        http::StatusCode::OK,
        Json(RecordResponse::from(Record { key, value })),
    ))
}
