//! Bearer token extraction

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use http::header::AUTHORIZATION;
use http::request::Parts;
use http::StatusCode;

use crate::tokens::TokenError;
use crate::ServiceState;

use super::error::respond;

/// Username of the caller, taken from a valid `Authorization: Bearer` token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

#[async_trait]
impl FromRequestParts<ServiceState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingToken)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::BadScheme)?;

        let username = state.tokens().verify(token.trim())?;
        // the empty username addresses the global tree
        if username.is_empty() {
            return Err(TokenError::Malformed.into());
        }
        Ok(AuthUser(username))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingToken,
    #[error("authorization header must use the Bearer scheme")]
    BadScheme,
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self, "rejected bearer token");
        respond(StatusCode::UNAUTHORIZED, "unauthorized", self)
    }
}
