use axum::routing::{get, post};
use axum::Router;

pub mod master;
pub mod status;
pub mod unseal;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/status", get(status::handler))
        .route("/unseal", post(unseal::handler))
        .route("/unseal/complete", post(unseal::complete_handler))
        .route("/unseal/reset", post(unseal::reset_handler))
        .route("/seal", post(status::seal_handler))
        .route("/master", get(master::handler))
        .route("/master/complete", post(master::complete_handler))
        .route("/master/abort", post(master::abort_handler))
        .with_state(state)
}
