//! Transactional nested-namespace storage
//!
//! A namespace maps names to either a raw byte value or exactly one child
//! namespace, never both. Every operation happens inside a transaction handed
//! out by a [`NamespaceStore`]; a store admits many concurrent readers or a
//! single writer. Write transactions become visible atomically on
//! [`NamespaceTx::commit`] and are rolled back when dropped.
//!
//! The root namespace always holds three top-level namespaces:
//! [`KV`] for per-user secret trees, [`USER`] for credentials and
//! [`META`] for singleton bookkeeping such as the root key envelope.

use std::fmt::{self, Debug, Display};

use async_trait::async_trait;

use crate::error::ErrorKind;

mod memory;

pub use memory::MemoryNamespaceStore;

/// Per-user secret trees
pub const KV: &[u8] = b"kv";
/// Username to credential hash
pub const USER: &[u8] = b"user";
/// Root key envelope and other singletons
pub const META: &[u8] = b"meta";

/// Opaque handle to a namespace, valid for the transaction that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceId(pub i64);

impl NamespaceId {
    pub const ROOT: NamespaceId = NamespaceId(1);
}

impl Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a name inside a namespace holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Value(Vec<u8>),
    Namespace,
}

impl Entry {
    pub fn is_namespace(&self) -> bool {
        matches!(self, Entry::Namespace)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NamespaceError {
    #[error("namespace not found: {0}")]
    NotFound(String),
    #[error("incompatible value at {0}")]
    IncompatibleValue(String),
    #[error("transaction is read-only")]
    ReadOnly,
    #[error("unknown namespace handle {0}")]
    UnknownHandle(NamespaceId),
    #[error("storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl NamespaceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NamespaceError::NotFound(_) => ErrorKind::NotFound,
            NamespaceError::IncompatibleValue(_) => ErrorKind::Conflict,
            NamespaceError::ReadOnly
            | NamespaceError::UnknownHandle(_)
            | NamespaceError::Backend(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn not_found(name: &[u8]) -> Self {
        NamespaceError::NotFound(String::from_utf8_lossy(name).into_owned())
    }

    pub(crate) fn incompatible(name: &[u8]) -> Self {
        NamespaceError::IncompatibleValue(String::from_utf8_lossy(name).into_owned())
    }
}

/// An embedded store of nested namespaces
#[async_trait]
pub trait NamespaceStore: Send + Sync + Debug + Clone + 'static {
    type Tx: NamespaceTx;

    /// Begin a read-only transaction; waits for any in-flight writer
    async fn begin_read(&self) -> Result<Self::Tx, NamespaceError>;

    /// Begin a read-write transaction; holds the store's exclusive write
    /// lock until the transaction is committed or dropped
    async fn begin_write(&self) -> Result<Self::Tx, NamespaceError>;
}

/// A single transaction against a [`NamespaceStore`]
#[async_trait]
pub trait NamespaceTx: Send {
    fn is_writable(&self) -> bool;

    /// Child namespace stored under `name`, if `name` holds one
    async fn open_child(
        &mut self,
        parent: NamespaceId,
        name: &[u8],
    ) -> Result<Option<NamespaceId>, NamespaceError>;

    /// Child namespace under `name`, created if absent.
    ///
    /// Fails with [`NamespaceError::IncompatibleValue`] when `name` holds a value.
    async fn open_or_create_child(
        &mut self,
        parent: NamespaceId,
        name: &[u8],
    ) -> Result<NamespaceId, NamespaceError>;

    /// Value stored under `key`; `None` when absent or when `key` is a namespace
    async fn get(&mut self, ns: NamespaceId, key: &[u8])
        -> Result<Option<Vec<u8>>, NamespaceError>;

    async fn put(&mut self, ns: NamespaceId, key: &[u8], value: &[u8])
        -> Result<(), NamespaceError>;

    /// Remove the value under `key`; a missing key is not an error
    async fn delete_key(&mut self, ns: NamespaceId, key: &[u8]) -> Result<(), NamespaceError>;

    /// Remove the child namespace under `name` together with its whole subtree
    async fn delete_child(&mut self, ns: NamespaceId, name: &[u8]) -> Result<(), NamespaceError>;

    /// Every entry of the namespace, ordered by name
    async fn entries(&mut self, ns: NamespaceId) -> Result<Vec<(Vec<u8>, Entry)>, NamespaceError>;

    async fn is_empty(&mut self, ns: NamespaceId) -> Result<bool, NamespaceError> {
        Ok(self.entries(ns).await?.is_empty())
    }

    /// Make every change of this transaction durable
    async fn commit(self) -> Result<(), NamespaceError>;
}

/// Open one of the namespaces that live directly under the root
pub async fn open_top_level<T: NamespaceTx>(
    tx: &mut T,
    name: &[u8],
) -> Result<NamespaceId, NamespaceError> {
    tx.open_child(NamespaceId::ROOT, name)
        .await?
        .ok_or_else(|| NamespaceError::not_found(name))
}
