use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};

use common::prelude::{AccountError, VaultError};

use super::{issue, Credentials};
use crate::http_server::api::error::{from_kind, respond};
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<Credentials>,
) -> Result<impl IntoResponse, SigninError> {
    let store = state.vault().store()?;
    store
        .accounts()
        .verify(&req.username, &req.password)
        .await?;

    Ok((http::StatusCode::OK, Json(issue(&state, &req.username))).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum SigninError {
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error(transparent)]
    Account(#[from] AccountError),
}

impl IntoResponse for SigninError {
    fn into_response(self) -> Response {
        match self {
            SigninError::Vault(e) => from_kind(e.kind(), e),
            // unknown users and wrong passwords look the same from outside
            SigninError::Account(AccountError::UserNotFound(_))
            | SigninError::Account(AccountError::InvalidCredentials) => respond(
                http::StatusCode::UNAUTHORIZED,
                "unauthorized",
                "invalid credentials",
            ),
            SigninError::Account(e) => from_kind(e.kind(), e),
        }
    }
}
