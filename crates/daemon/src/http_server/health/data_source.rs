use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use http::request::Parts;

use crate::ServiceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DataSourceError {
    #[error("vault is sealed")]
    Sealed,
    #[error("namespace store is unavailable")]
    StoreUnavailable,
}

/// Whatever the readiness probe depends on
#[async_trait]
pub trait Readiness: Send + Sync + std::fmt::Debug {
    async fn is_ready(&self) -> Result<(), DataSourceError>;
}

#[derive(Debug)]
struct VaultReadiness(ServiceState);

#[async_trait]
impl Readiness for VaultReadiness {
    async fn is_ready(&self) -> Result<(), DataSourceError> {
        let store = self
            .0
            .vault()
            .store()
            .map_err(|_| DataSourceError::Sealed)?;
        store
            .list(&common::prelude::Prefix::global())
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "readiness probe could not read the store");
                DataSourceError::StoreUnavailable
            })?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StateDataSource(Arc<dyn Readiness>);

impl StateDataSource {
    pub fn new(readiness: Arc<dyn Readiness>) -> Self {
        Self(readiness)
    }

    pub async fn is_ready(&self) -> Result<(), DataSourceError> {
        self.0.is_ready().await
    }
}

#[async_trait]
impl FromRequestParts<ServiceState> for StateDataSource {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::new(Arc::new(VaultReadiness(state.clone()))))
    }
}
