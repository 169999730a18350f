use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};

pub mod signin;
pub mod signup;

use crate::ServiceState;

/// Credentials posted to both auth endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    /// Seconds until the token expires
    pub expires_in: u64,
}

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/signup", post(signup::handler))
        .route("/signin", post(signin::handler))
        .with_state(state)
}

fn issue(state: &ServiceState, username: &str) -> TokenResponse {
    TokenResponse {
        token: state.tokens().issue(username),
        expires_in: state.tokens().ttl().as_secs(),
    }
}
