//! strongroom daemon: SQLite-backed namespaces, the HTTP API and the
//! process plumbing that ties them to a sealed [`common::prelude::Vault`].

pub(crate) mod database;
pub mod http_server;
pub mod process;
pub mod service_config;
pub mod service_state;
pub mod tokens;

// State directory, config.toml and token.key
pub mod state;

pub use process::{spawn_service, start_service, ShutdownHandle};
pub use service_config::Config as ServiceConfig;
pub use service_state::State as ServiceState;
pub use state::{AppConfig, AppState, StateError};
