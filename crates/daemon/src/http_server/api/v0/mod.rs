use axum::Router;

pub mod auth;
pub mod list;
pub mod seal;
pub mod secrets;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .nest("/seal", seal::router(state.clone()))
        .nest("/auth", auth::router(state.clone()))
        .nest("/secrets", secrets::router(state.clone()))
        .merge(list::router(state.clone()))
        .with_state(state)
}
