use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use common::prelude::{Prefix, Record, StoreError, VaultError};

pub mod create;
pub mod delete;
pub mod get;
pub mod update;

use crate::http_server::api::encoding::encode_value;
use crate::http_server::api::error::{from_kind, respond};
use crate::ServiceState;

/// `?path=a/b/c` below the caller's own tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub path: String,
}

impl PathQuery {
    /// Prefix for `username`; empty segments in the query are dropped
    pub fn prefix(&self, username: &str) -> Prefix {
        Prefix::parse(username, &self.path)
    }
}

/// A record as rendered on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordResponse {
    pub key: String,
    pub value: String,
    pub is_base64: bool,
}

impl From<Record> for RecordResponse {
    fn from(record: Record) -> Self {
        let (value, is_base64) = encode_value(record.value);
        Self {
            key: record.key,
            value,
            is_base64,
        }
    }
}

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", post(create::handler))
        .route(
            "/:key",
            get(get::handler)
                .patch(update::handler)
                .delete(delete::handler),
        )
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("value is not valid base64")]
    InvalidValue,
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for SecretsError {
    fn into_response(self) -> Response {
        match self {
            SecretsError::InvalidValue => {
                respond(http::StatusCode::BAD_REQUEST, "validation", self)
            }
            SecretsError::Vault(e) => from_kind(e.kind(), e),
            SecretsError::Store(e) => from_kind(e.kind(), e),
        }
    }
}
