use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};

use common::prelude::{AccountError, VaultError};

use super::{issue, Credentials};
use crate::http_server::api::error::from_kind;
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<Credentials>,
) -> Result<impl IntoResponse, SignupError> {
    let store = state.vault().store()?;
    store
        .accounts()
        .create(&req.username, &req.password)
        .await?;
    tracing::info!(username = %req.username, "user created");

    Ok((
        http::StatusCode::CREATED,
        Json(issue(&state, &req.username)),
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum SignupError {
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error(transparent)]
    Account(#[from] AccountError),
}

impl IntoResponse for SignupError {
    fn into_response(self) -> Response {
        match self {
            SignupError::Vault(e) => from_kind(e.kind(), e),
            SignupError::Account(e) => from_kind(e.kind(), e),
        }
    }
}
