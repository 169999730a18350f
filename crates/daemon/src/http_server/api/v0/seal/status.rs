use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use common::prelude::{SealStatus, VaultError};

use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::http_server::api::error::from_kind;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StatusResponse {
    Sealed {
        threshold: Option<u8>,
    },
    Unsealing {
        collected: usize,
        threshold: Option<u8>,
    },
    Unsealed,
}

impl From<SealStatus> for StatusResponse {
    fn from(status: SealStatus) -> Self {
        match status {
            SealStatus::Sealed { threshold } => StatusResponse::Sealed { threshold },
            SealStatus::Unsealing {
                collected,
                threshold,
            } => StatusResponse::Unsealing {
                collected,
                threshold,
            },
            SealStatus::Unsealed => StatusResponse::Unsealed,
        }
    }
}

impl std::fmt::Display for StatusResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let threshold = |t: &Option<u8>| t.map_or("?".to_string(), |t| t.to_string());
        match self {
            StatusResponse::Sealed { threshold: t } => {
                write!(f, "sealed (threshold {})", threshold(t))
            }
            StatusResponse::Unsealing {
                collected,
                threshold: t,
            } => write!(f, "unsealing ({}/{} shares)", collected, threshold(t)),
            StatusResponse::Unsealed => write!(f, "unsealed"),
        }
    }
}

pub async fn handler(State(state): State<ServiceState>) -> Result<impl IntoResponse, StatusError> {
    let status = state.vault().status().await?;
    Ok((http::StatusCode::OK, Json(StatusResponse::from(status))).into_response())
}

/// Drop the live root key and return to the sealed state
pub async fn seal_handler(
    State(state): State<ServiceState>,
) -> Result<impl IntoResponse, StatusError> {
    state.vault().seal().await;
    tracing::info!("vault sealed on request");
    let status = state.vault().status().await?;
    Ok((http::StatusCode::OK, Json(StatusResponse::from(status))).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error(transparent)]
    Vault(#[from] VaultError),
}

impl IntoResponse for StatusError {
    fn into_response(self) -> Response {
        match self {
            StatusError::Vault(e) => from_kind(e.kind(), e),
        }
    }
}

impl ApiRequest for StatusRequest {
    type Response = StatusResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/seal/status")?;
        Ok(client.get(full_url))
    }
}
