//! Seal lifecycle
//!
//! A [`Vault`] starts sealed. Operators submit shares one at a time; once
//! enough are collected, [`Vault::complete`] reconstructs the master secret,
//! opens the root key envelope and exposes the [`SecretStore`]. The state is
//! held behind a single read/write lock: store access takes a shared guard,
//! every transition takes the exclusive one, and requests arriving while a
//! transition holds the lock are rejected rather than queued.

use std::mem;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{OwnedRwLockReadGuard, RwLock};
use zeroize::Zeroizing;

use crate::crypto::{combine, ShamirError};
use crate::error::ErrorKind;
use crate::keyring::{Keyring, KeyringError};
use crate::namespace::NamespaceStore;
use crate::store::SecretStore;

mod ceremony;

pub use ceremony::{
    CeremonyError, Distribution, GenerationCeremony, ShareDelivery, DEFAULT_ACK_TIMEOUT,
};

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("vault is sealed")]
    Sealed,
    #[error("vault is already unsealed")]
    AlreadyUnsealed,
    #[error("share is too short")]
    InvalidShare,
    #[error("share length mismatch: expected {expected}, got {got}")]
    ShareLengthMismatch { expected: usize, got: usize },
    #[error("share already added")]
    AlreadyAdded,
    #[error("no shares have been submitted")]
    NoShares,
    #[error("vault already holds a root key; unseal before generating new shares")]
    AlreadyInitialized,
    #[error("only {delivered} of {threshold} required shares were delivered")]
    InsufficientDeliveries { delivered: usize, threshold: u8 },
    #[error(transparent)]
    Shamir(#[from] ShamirError),
    #[error(transparent)]
    Keyring(#[from] KeyringError),
    #[error(transparent)]
    Ceremony(#[from] CeremonyError),
}

impl VaultError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::Sealed => ErrorKind::Sealed,
            VaultError::InvalidShare | VaultError::ShareLengthMismatch { .. } => {
                ErrorKind::Validation
            }
            VaultError::AlreadyUnsealed
            | VaultError::AlreadyAdded
            | VaultError::NoShares
            | VaultError::AlreadyInitialized
            | VaultError::InsufficientDeliveries { .. } => ErrorKind::Conflict,
            VaultError::Shamir(e) => e.kind(),
            VaultError::Keyring(e) => e.kind(),
            VaultError::Ceremony(e) => e.kind(),
        }
    }
}

pub enum SealState<S> {
    Sealed,
    Unsealing { shares: Vec<Zeroizing<Vec<u8>>> },
    Unsealed(SecretStore<S>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SealStatus {
    Sealed {
        threshold: Option<u8>,
    },
    Unsealing {
        collected: usize,
        threshold: Option<u8>,
    },
    Unsealed,
}

/// Result of a completed generation ceremony
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub recipients: usize,
    pub delivered: usize,
    pub threshold: u8,
    /// Whether the root key was re-wrapped under the new master secret
    pub rotated: bool,
}

/// Read guard over the unsealed store
pub type StoreGuard<S> = OwnedRwLockReadGuard<SealState<S>, SecretStore<S>>;

pub struct Vault<S> {
    namespaces: S,
    keyring: Keyring<S>,
    state: Arc<RwLock<SealState<S>>>,
    ceremony: Arc<GenerationCeremony>,
}

impl<S: Clone> Clone for Vault<S> {
    fn clone(&self) -> Self {
        Self {
            namespaces: self.namespaces.clone(),
            keyring: self.keyring.clone(),
            state: self.state.clone(),
            ceremony: self.ceremony.clone(),
        }
    }
}

impl<S: NamespaceStore> Vault<S> {
    pub fn new(namespaces: S) -> Self {
        Self {
            keyring: Keyring::new(namespaces.clone()),
            namespaces,
            state: Arc::new(RwLock::new(SealState::Sealed)),
            ceremony: Arc::new(GenerationCeremony::new()),
        }
    }

    pub fn keyring(&self) -> &Keyring<S> {
        &self.keyring
    }

    pub async fn status(&self) -> Result<SealStatus, VaultError> {
        let collected = match &*self.state.read().await {
            SealState::Unsealed(_) => return Ok(SealStatus::Unsealed),
            SealState::Sealed => None,
            SealState::Unsealing { shares } => Some(shares.len()),
        };
        let threshold = self.keyring.threshold().await?;
        Ok(match collected {
            None => SealStatus::Sealed { threshold },
            Some(collected) => SealStatus::Unsealing {
                collected,
                threshold,
            },
        })
    }

    /// Whether the store is reachable right now
    pub fn is_unsealed(&self) -> bool {
        self.state
            .try_read()
            .map(|state| matches!(*state, SealState::Unsealed(_)))
            .unwrap_or(false)
    }

    /// Submit one share, returning how many have been collected so far
    pub async fn add_share(&self, share: Vec<u8>) -> Result<usize, VaultError> {
        let share = Zeroizing::new(share);
        if share.len() < 2 {
            return Err(VaultError::InvalidShare);
        }

        let mut state = self.state.write().await;
        match &mut *state {
            SealState::Unsealed(_) => return Err(VaultError::AlreadyUnsealed),
            SealState::Unsealing { shares } => {
                let expected = shares[0].len();
                if share.len() != expected {
                    return Err(VaultError::ShareLengthMismatch {
                        expected,
                        got: share.len(),
                    });
                }
                if shares.iter().any(|existing| **existing == *share) {
                    return Err(VaultError::AlreadyAdded);
                }
                shares.push(share);
                tracing::debug!(collected = shares.len(), "share added");
                return Ok(shares.len());
            }
            SealState::Sealed => {}
        }

        *state = SealState::Unsealing {
            shares: vec![share],
        };
        tracing::debug!(collected = 1, "unseal started");
        Ok(1)
    }

    /// Combine the collected shares and unseal.
    ///
    /// Whatever the outcome, the collected shares are consumed: on failure the
    /// vault is back to [`SealState::Sealed`] and the ceremony starts over.
    pub async fn complete(&self) -> Result<(), VaultError> {
        let mut state = self.state.write().await;
        let shares = match mem::replace(&mut *state, SealState::Sealed) {
            SealState::Unsealing { shares } => shares,
            SealState::Sealed => return Err(VaultError::NoShares),
            unsealed @ SealState::Unsealed(_) => {
                *state = unsealed;
                return Err(VaultError::AlreadyUnsealed);
            }
        };

        let views: Vec<&[u8]> = shares.iter().map(|share| share.as_slice()).collect();
        let secret = Zeroizing::new(combine(&views).inspect_err(|e| {
            tracing::warn!("unseal failed, shares discarded: {e}");
        })?);
        let root_key = self.keyring.unseal(&secret).await.inspect_err(|e| {
            tracing::warn!("unseal failed, shares discarded: {e}");
        })?;

        *state = SealState::Unsealed(SecretStore::new(self.namespaces.clone(), root_key));
        tracing::info!("vault unsealed");
        Ok(())
    }

    /// Discard collected shares without attempting to unseal
    pub async fn reset_unseal(&self) -> usize {
        let mut state = self.state.write().await;
        let discarded = match &*state {
            SealState::Unsealing { shares } => shares.len(),
            _ => return 0,
        };
        *state = SealState::Sealed;
        discarded
    }

    /// Drop the live root key. Waits for in-flight store operations.
    pub async fn seal(&self) {
        let mut state = self.state.write().await;
        *state = SealState::Sealed;
        tracing::info!("vault sealed");
    }

    /// Shared access to the unsealed store.
    ///
    /// Fails with [`VaultError::Sealed`] when sealed, or while a seal
    /// transition holds the state lock.
    pub fn store(&self) -> Result<StoreGuard<S>, VaultError> {
        let guard = self
            .state
            .clone()
            .try_read_owned()
            .map_err(|_| VaultError::Sealed)?;
        OwnedRwLockReadGuard::try_map(guard, |state| match state {
            SealState::Unsealed(store) => Some(store),
            _ => None,
        })
        .map_err(|_| VaultError::Sealed)
    }

    /// Register a party waiting for a share of the next master secret
    pub async fn register_recipient(
        &self,
        threshold: usize,
    ) -> Result<flume::Receiver<ShareDelivery>, VaultError> {
        Ok(self.ceremony.register(threshold).await?)
    }

    pub async fn pending_recipients(&self) -> (usize, Option<u8>) {
        self.ceremony.pending().await
    }

    pub async fn abort_generation(&self) -> usize {
        let dropped = self.ceremony.abort().await;
        tracing::info!(dropped, "generation ceremony aborted");
        dropped
    }

    /// Mint a new master secret and hand its shares to every registered
    /// recipient.
    ///
    /// While unsealed, the root key is re-wrapped under the new secret once
    /// at least `threshold` recipients acknowledged their share. Short of
    /// that, the old envelope stays in place. While sealed,
    /// shares can only be minted for a vault that has no root key yet.
    pub async fn complete_generation(&self) -> Result<GenerationReport, VaultError> {
        let state = self.state.read().await;
        let root_key = match &*state {
            SealState::Unsealed(store) => Some(store.root_key().clone()),
            _ => None,
        };

        if root_key.is_none() && self.keyring.is_initialized().await? {
            self.ceremony.abort().await;
            return Err(VaultError::AlreadyInitialized);
        }

        let distribution = self.ceremony.distribute().await?;
        if distribution.delivered < usize::from(distribution.threshold) {
            return Err(VaultError::InsufficientDeliveries {
                delivered: distribution.delivered,
                threshold: distribution.threshold,
            });
        }

        let rotated = match root_key {
            Some(root_key) => {
                self.keyring
                    .rewrap(&root_key, distribution.secret.bytes())
                    .await?;
                true
            }
            None => false,
        };
        self.keyring.set_threshold(distribution.threshold).await?;
        drop(state);

        Ok(GenerationReport {
            recipients: distribution.recipients,
            delivered: distribution.delivered,
            threshold: distribution.threshold,
            rotated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{split, Secret};
    use crate::namespace::MemoryNamespaceStore;
    use crate::store::Prefix;

    fn vault() -> Vault<MemoryNamespaceStore> {
        Vault::new(MemoryNamespaceStore::new())
    }

    #[tokio::test]
    async fn test_starts_sealed() {
        let vault = vault();
        assert_eq!(
            vault.status().await.unwrap(),
            SealStatus::Sealed { threshold: None }
        );
        assert!(!vault.is_unsealed());
        assert!(matches!(vault.store(), Err(VaultError::Sealed)));
    }

    #[tokio::test]
    async fn test_unseal_seal_cycle() {
        let vault = vault();
        let master = Secret::generate().unwrap();
        let shares = split(master.bytes(), 3, 2).unwrap();

        assert_eq!(vault.add_share(shares[0].clone()).await.unwrap(), 1);
        assert_eq!(vault.add_share(shares[2].clone()).await.unwrap(), 2);
        assert_eq!(
            vault.status().await.unwrap(),
            SealStatus::Unsealing {
                collected: 2,
                threshold: None
            }
        );
        vault.complete().await.unwrap();
        assert!(vault.is_unsealed());

        let prefix = Prefix::user("alice");
        vault.store().unwrap().set(&prefix, "k", b"v").await.unwrap();

        vault.seal().await;
        assert!(matches!(vault.store(), Err(VaultError::Sealed)));
    }

    #[tokio::test]
    async fn test_share_validation() {
        let vault = vault();
        let shares = split(&[1u8; 32], 3, 2).unwrap();

        assert!(matches!(
            vault.add_share(vec![1]).await,
            Err(VaultError::InvalidShare)
        ));
        vault.add_share(shares[0].clone()).await.unwrap();
        assert!(matches!(
            vault.add_share(shares[0].clone()).await,
            Err(VaultError::AlreadyAdded)
        ));
        assert!(matches!(
            vault.add_share(shares[1][1..].to_vec()).await,
            Err(VaultError::ShareLengthMismatch {
                expected: 33,
                got: 32
            })
        ));
        assert_eq!(vault.reset_unseal().await, 1);
        assert!(matches!(vault.complete().await, Err(VaultError::NoShares)));
    }

    #[tokio::test]
    async fn test_store_rejected_during_transition() {
        let vault = vault();
        let shares = split(Secret::generate().unwrap().bytes(), 2, 2).unwrap();
        for share in shares {
            vault.add_share(share).await.unwrap();
        }
        vault.complete().await.unwrap();

        let _transition = vault.state.write().await;
        assert!(matches!(vault.store(), Err(VaultError::Sealed)));
        assert!(!vault.is_unsealed());
    }

    #[tokio::test]
    async fn test_complete_while_unsealed() {
        let vault = vault();
        for share in split(Secret::generate().unwrap().bytes(), 2, 2).unwrap() {
            vault.add_share(share).await.unwrap();
        }
        vault.complete().await.unwrap();
        assert!(matches!(
            vault.complete().await,
            Err(VaultError::AlreadyUnsealed)
        ));
        assert!(matches!(
            vault.add_share(vec![1, 2, 3]).await,
            Err(VaultError::AlreadyUnsealed)
        ));
        assert!(vault.is_unsealed());
    }

    #[tokio::test]
    async fn test_generation_refused_for_initialized_sealed_vault() {
        let vault = vault();
        for share in split(Secret::generate().unwrap().bytes(), 2, 2).unwrap() {
            vault.add_share(share).await.unwrap();
        }
        vault.complete().await.unwrap();
        vault.seal().await;

        let receiver = vault.register_recipient(2).await.unwrap();
        let _other = vault.register_recipient(2).await.unwrap();
        let err = vault.complete_generation().await.unwrap_err();
        assert!(matches!(err, VaultError::AlreadyInitialized));
        assert!(receiver.recv_async().await.is_err());
    }
}
