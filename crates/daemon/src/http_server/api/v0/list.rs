use axum::extract::{Json, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use common::prelude::{BucketInfo, BucketTree};

use super::secrets::{PathQuery, RecordResponse, SecretsError};
use crate::http_server::api::auth::AuthUser;
use crate::ServiceState;

/// Direct children of a namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    pub buckets: Vec<String>,
    pub records: Vec<RecordResponse>,
}

impl From<BucketInfo> for ListResponse {
    fn from(info: BucketInfo) -> Self {
        Self {
            buckets: info.buckets,
            records: info.records.into_iter().map(Into::into).collect(),
        }
    }
}

/// A namespace with everything below it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeResponse {
    pub name: String,
    pub buckets: Vec<TreeResponse>,
    pub records: Vec<RecordResponse>,
}

impl From<BucketTree> for TreeResponse {
    fn from(tree: BucketTree) -> Self {
        Self {
            name: tree.name,
            buckets: tree.buckets.into_iter().map(Into::into).collect(),
            records: tree.records.into_iter().map(Into::into).collect(),
        }
    }
}

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/list", get(list_handler))
        .route("/reclist", get(reclist_handler))
        .with_state(state)
}

pub async fn list_handler(
    State(state): State<ServiceState>,
    AuthUser(username): AuthUser,
    Query(query): Query<PathQuery>,
) -> Result<impl IntoResponse, SecretsError> {
    let store = state.vault().store()?;
    let info = store.list(&query.prefix(&username)).await?;
    Ok((http::StatusCode::OK, Json(ListResponse::from(info))))
}

pub async fn reclist_handler(
    State(state): State<ServiceState>,
    AuthUser(username): AuthUser,
    Query(query): Query<PathQuery>,
) -> Result<impl IntoResponse, SecretsError> {
    let store = state.vault().store()?;
    let tree = store.list_recursively(&query.prefix(&username)).await?;
    Ok((http::StatusCode::OK, Json(TreeResponse::from(tree))))
}
