use std::sync::Arc;

use common::prelude::Vault;

use crate::database::{Database, DatabaseSetupError, SqliteNamespaceStore};
use crate::tokens::{TokenError, TokenSigner};
use crate::ServiceConfig;

/// Shared state of a running daemon
#[derive(Clone)]
pub struct State {
    vault: Vault<SqliteNamespaceStore>,
    tokens: Arc<TokenSigner>,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("unsealed", &self.vault.is_unsealed())
            .field("tokens", &self.tokens)
            .finish()
    }
}

impl State {
    pub async fn from_config(config: &ServiceConfig) -> Result<Self, StateSetupError> {
        let database = match &config.sqlite_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "opening namespace store");
                Database::open(path).await?
            }
            None => {
                tracing::warn!("no database path configured, secrets will not outlive this process");
                Database::in_memory().await?
            }
        };

        let vault = Vault::new(SqliteNamespaceStore::new(database));
        let tokens = TokenSigner::new(&config.token_key, config.token_ttl)?;
        Ok(Self::new(vault, tokens))
    }

    pub fn new(vault: Vault<SqliteNamespaceStore>, tokens: TokenSigner) -> Self {
        Self {
            vault,
            tokens: Arc::new(tokens),
        }
    }

    pub fn vault(&self) -> &Vault<SqliteNamespaceStore> {
        &self.vault
    }

    pub fn tokens(&self) -> &TokenSigner {
        &self.tokens
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("database setup error: {0}")]
    Database(#[from] DatabaseSetupError),
    #[error("token signer error: {0}")]
    Tokens(#[from] TokenError),
}
