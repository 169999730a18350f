//! Shared test utilities for vault and store integration tests
#![allow(dead_code)]

pub use common::crypto::{combine, split, Secret};
pub use common::prelude::*;

pub const PARTS: usize = 5;
pub const THRESHOLD: usize = 3;

/// A fresh vault plus a 3-of-5 split of a new master secret
pub fn sealed_vault() -> (Vault<MemoryNamespaceStore>, Vec<Vec<u8>>) {
    let master = Secret::generate().unwrap();
    let shares = split(master.bytes(), PARTS, THRESHOLD).unwrap();
    (Vault::new(MemoryNamespaceStore::new()), shares)
}

/// Submit every share and complete the unseal
pub async fn unseal(
    vault: &Vault<MemoryNamespaceStore>,
    shares: &[Vec<u8>],
) -> Result<(), VaultError> {
    for share in shares {
        vault.add_share(share.clone()).await?;
    }
    vault.complete().await
}

/// A vault unsealed with the first `THRESHOLD` of its shares
pub async fn unsealed_vault() -> (Vault<MemoryNamespaceStore>, Vec<Vec<u8>>) {
    let (vault, shares) = sealed_vault();
    unseal(&vault, &shares[..THRESHOLD]).await.unwrap();
    (vault, shares)
}

/// Register a recipient that confirms its share as soon as it arrives
pub async fn acking_recipient(
    vault: &Vault<MemoryNamespaceStore>,
    threshold: usize,
) -> tokio::task::JoinHandle<Option<Vec<u8>>> {
    let receiver = vault.register_recipient(threshold).await.unwrap();
    tokio::spawn(async move {
        let delivery = receiver.recv_async().await.ok()?;
        let share = delivery.share().to_vec();
        delivery.acknowledge();
        Some(share)
    })
}
