//! Hierarchical, encrypted secret storage
//!
//! Records live in nested namespaces under `kv/<username>/<segment>...`.
//! Every operation runs in exactly one namespace transaction, so the lazy
//! namespace creation of [`SecretStore::set`] and the prune walk of
//! [`SecretStore::delete`] are atomic with the record change.

use std::fmt;

use crate::crypto::{Cipher, Secret, SecretError};
use crate::error::ErrorKind;
use crate::namespace::{
    open_top_level, Entry, NamespaceError, NamespaceId, NamespaceStore, NamespaceTx, KV,
};

mod accounts;
mod prefix;

pub use accounts::{AccountError, Accounts};
pub use prefix::Prefix;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("empty path segment")]
    EmptySegment,
    #[error("empty key")]
    EmptyKey,
    #[error("records need at least one namespace below kv")]
    EmptyPrefix,
    #[error("bucket not found: {0}")]
    BucketNotFound(String),
    #[error("record not found: {0}")]
    RecordNotFound(String),
    #[error(transparent)]
    Secret(#[from] SecretError),
    #[error(transparent)]
    Namespace(#[from] NamespaceError),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::EmptySegment | StoreError::EmptyKey | StoreError::EmptyPrefix => {
                ErrorKind::Validation
            }
            StoreError::BucketNotFound(_) | StoreError::RecordNotFound(_) => ErrorKind::NotFound,
            StoreError::Secret(e) => e.kind(),
            StoreError::Namespace(e) => e.kind(),
        }
    }
}

/// A decrypted leaf value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub value: Vec<u8>,
}

/// One level of a namespace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketInfo {
    pub buckets: Vec<String>,
    pub records: Vec<Record>,
}

/// A namespace and everything below it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketTree {
    pub name: String,
    pub buckets: Vec<BucketTree>,
    pub records: Vec<Record>,
}

/// Secret store over an unsealed root key
pub struct SecretStore<S> {
    namespaces: S,
    root_key: Secret,
    cipher: Cipher,
}

impl<S> fmt::Debug for SecretStore<S>
where
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretStore")
            .field("namespaces", &self.namespaces)
            .finish_non_exhaustive()
    }
}

fn check_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::EmptyKey);
    }
    Ok(())
}

fn name_to_string(name: Vec<u8>) -> String {
    String::from_utf8(name).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Walk `names` down from `kv`, returning every namespace visited,
/// `kv` included.
async fn resolve_chain<T: NamespaceTx>(
    tx: &mut T,
    prefix: &Prefix,
    names: &[&[u8]],
) -> Result<Vec<NamespaceId>, StoreError> {
    let mut chain = Vec::with_capacity(names.len() + 1);
    let mut current = open_top_level(tx, KV).await?;
    chain.push(current);
    for name in names {
        current = tx
            .open_child(current, name)
            .await?
            .ok_or_else(|| StoreError::BucketNotFound(prefix.to_string()))?;
        chain.push(current);
    }
    Ok(chain)
}

async fn resolve<T: NamespaceTx>(
    tx: &mut T,
    prefix: &Prefix,
    names: &[&[u8]],
) -> Result<NamespaceId, StoreError> {
    let chain = resolve_chain(tx, prefix, names).await?;
    Ok(chain[names.len()])
}

impl<S: NamespaceStore> SecretStore<S> {
    pub fn new(namespaces: S, root_key: Secret) -> Self {
        let cipher = root_key.cipher();
        Self {
            namespaces,
            root_key,
            cipher,
        }
    }

    pub fn namespaces(&self) -> &S {
        &self.namespaces
    }

    pub(crate) fn root_key(&self) -> &Secret {
        &self.root_key
    }

    pub fn accounts(&self) -> Accounts<S> {
        Accounts::new(self.namespaces.clone())
    }

    pub async fn get(&self, prefix: &Prefix, key: &str) -> Result<Vec<u8>, StoreError> {
        check_key(key)?;
        let names = prefix.names()?;

        let mut tx = self.namespaces.begin_read().await?;
        let ns = resolve(&mut tx, prefix, &names).await?;
        let ciphertext = tx
            .get(ns, key.as_bytes())
            .await?
            .ok_or_else(|| StoreError::RecordNotFound(key.to_string()))?;
        drop(tx);

        Ok(self.cipher.decrypt(&ciphertext)?)
    }

    /// Encrypt and store `value`, creating any missing namespace on the way
    pub async fn set(&self, prefix: &Prefix, key: &str, value: &[u8]) -> Result<(), StoreError> {
        check_key(key)?;
        let names = prefix.names()?;
        // kv itself only holds per-user namespaces
        if names.is_empty() {
            return Err(StoreError::EmptyPrefix);
        }
        let ciphertext = self.cipher.encrypt(value)?;

        let mut tx = self.namespaces.begin_write().await?;
        let mut current = open_top_level(&mut tx, KV).await?;
        for name in &names {
            current = tx.open_or_create_child(current, name).await?;
        }
        tx.put(current, key.as_bytes(), &ciphertext).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Delete a record and prune every namespace the deletion left empty,
    /// walking from the leaf upwards. The per-user namespace is kept.
    ///
    /// Returns how many namespaces were pruned.
    pub async fn delete(&self, prefix: &Prefix, key: &str) -> Result<usize, StoreError> {
        check_key(key)?;
        let names = prefix.names()?;

        let mut tx = self.namespaces.begin_write().await?;
        let chain = resolve_chain(&mut tx, prefix, &names).await?;
        let leaf = chain[names.len()];

        if tx.get(leaf, key.as_bytes()).await?.is_none() {
            return Err(StoreError::RecordNotFound(key.to_string()));
        }
        tx.delete_key(leaf, key.as_bytes()).await?;

        // chain[i] is the namespace called names[i - 1], held by chain[i - 1]
        let mut pruned = 0;
        for i in (prefix.floor() + 1..=names.len()).rev() {
            if !tx.is_empty(chain[i]).await? {
                break;
            }
            tx.delete_child(chain[i - 1], names[i - 1]).await?;
            pruned += 1;
        }

        tx.commit().await?;
        tracing::debug!(%prefix, pruned, "deleted record");
        Ok(pruned)
    }

    /// Child namespaces and decrypted records directly under `prefix`
    pub async fn list(&self, prefix: &Prefix) -> Result<BucketInfo, StoreError> {
        let names = prefix.names()?;

        let mut tx = self.namespaces.begin_read().await?;
        let ns = resolve(&mut tx, prefix, &names).await?;
        let entries = tx.entries(ns).await?;
        drop(tx);

        let mut info = BucketInfo::default();
        for (name, entry) in entries {
            match entry {
                Entry::Namespace => info.buckets.push(name_to_string(name)),
                Entry::Value(ciphertext) => info.records.push(Record {
                    key: name_to_string(name),
                    value: self.cipher.decrypt(&ciphertext)?,
                }),
            }
        }
        Ok(info)
    }

    /// The whole tree under `prefix`, every record decrypted.
    ///
    /// Any record failing to decrypt fails the call.
    pub async fn list_recursively(&self, prefix: &Prefix) -> Result<BucketTree, StoreError> {
        struct Node {
            name: String,
            records: Vec<Record>,
            children: Vec<usize>,
        }

        let names = prefix.names()?;

        let mut tx = self.namespaces.begin_read().await?;
        let root = resolve(&mut tx, prefix, &names).await?;

        // children are always pushed after their parent
        let mut arena = vec![Node {
            name: prefix.leaf_name().to_string(),
            records: Vec::new(),
            children: Vec::new(),
        }];
        let mut stack = vec![(0usize, root)];

        while let Some((idx, ns)) = stack.pop() {
            for (name, entry) in tx.entries(ns).await? {
                match entry {
                    Entry::Namespace => {
                        let Some(child) = tx.open_child(ns, &name).await? else {
                            continue;
                        };
                        let child_idx = arena.len();
                        arena.push(Node {
                            name: name_to_string(name),
                            records: Vec::new(),
                            children: Vec::new(),
                        });
                        arena[idx].children.push(child_idx);
                        stack.push((child_idx, child));
                    }
                    Entry::Value(ciphertext) => {
                        let value = self.cipher.decrypt(&ciphertext)?;
                        arena[idx].records.push(Record {
                            key: name_to_string(name),
                            value,
                        });
                    }
                }
            }
        }
        drop(tx);

        let mut built: Vec<Option<BucketTree>> = (0..arena.len()).map(|_| None).collect();
        for (idx, node) in arena.into_iter().enumerate().rev() {
            let buckets = node
                .children
                .iter()
                .filter_map(|child| built[*child].take())
                .collect();
            built[idx] = Some(BucketTree {
                name: node.name,
                buckets,
                records: node.records,
            });
        }

        Ok(built.swap_remove(0).unwrap_or_default())
    }
}
