use axum::extract::{Json, Query, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use common::prelude::VaultError;

use super::status::StatusResponse;
use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::http_server::api::encoding::decode_share;
use crate::http_server::api::error::{from_kind, respond};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct UnsealRequest {
    /// One base64 encoded share of the master secret
    #[arg(long)]
    pub part: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsealResponse {
    /// Shares collected so far, this one included
    pub collected: usize,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Query(req): Query<UnsealRequest>,
) -> Result<impl IntoResponse, UnsealError> {
    let share = decode_share(&req.part).ok_or(UnsealError::InvalidPart)?;
    let collected = state.vault().add_share(share).await?;
    tracing::info!(collected, "unseal share accepted");

    Ok((http::StatusCode::OK, Json(UnsealResponse { collected })).into_response())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteRequest {}

/// Combine the collected shares and open the root key
pub async fn complete_handler(
    State(state): State<ServiceState>,
) -> Result<impl IntoResponse, UnsealError> {
    state.vault().complete().await?;
    tracing::info!("vault unsealed");
    let status = state.vault().status().await?;
    Ok((http::StatusCode::OK, Json(StatusResponse::from(status))).into_response())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    pub discarded: usize,
}

/// Throw away every share collected so far
pub async fn reset_handler(State(state): State<ServiceState>) -> impl IntoResponse {
    let discarded = state.vault().reset_unseal().await;
    tracing::info!(discarded, "unseal progress reset");
    (http::StatusCode::OK, Json(ResetResponse { discarded }))
}

#[derive(Debug, thiserror::Error)]
pub enum UnsealError {
    #[error("part is not valid base64")]
    InvalidPart,
    #[error(transparent)]
    Vault(#[from] VaultError),
}

impl IntoResponse for UnsealError {
    fn into_response(self) -> Response {
        match self {
            UnsealError::InvalidPart => {
                respond(http::StatusCode::BAD_REQUEST, "validation", self)
            }
            UnsealError::Vault(e) => {
                tracing::warn!(error = %e, "unseal step failed");
                from_kind(e.kind(), e)
            }
        }
    }
}

impl ApiRequest for UnsealRequest {
    type Response = UnsealResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/seal/unseal")?;
        Ok(client.post(full_url).query(&self))
    }
}

impl ApiRequest for CompleteRequest {
    type Response = StatusResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/seal/unseal/complete")?;
        Ok(client.post(full_url))
    }
}
