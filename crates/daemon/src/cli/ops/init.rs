use clap::Args;

use strongroom_daemon::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Port for the HTTP API
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<std::path::PathBuf>,

    /// Lifetime of issued bearer tokens, in seconds
    #[arg(long)]
    pub token_ttl_secs: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("state error: {0}")]
    StateError(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let defaults = AppConfig::default();
        let config = AppConfig {
            api_port: self.api_port.unwrap_or(defaults.api_port),
            log_dir: self.log_dir.clone(),
            token_ttl_secs: self.token_ttl_secs.unwrap_or(defaults.token_ttl_secs),
            ..defaults
        };

        let state = AppState::init(ctx.config_path.clone(), config)?;
        Ok(format!(
            "initialized {}\n  api_port: {}\n  database: {}",
            state.state_dir.display(),
            state.config.api_port,
            state.db_path.display()
        ))
    }
}
