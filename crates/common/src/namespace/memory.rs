use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use super::{Entry, NamespaceError, NamespaceId, NamespaceStore, NamespaceTx, KV, META, USER};

#[derive(Debug, Clone)]
enum Slot {
    Value(Vec<u8>),
    Child(NamespaceId),
}

/// Arena of namespaces keyed by handle
#[derive(Debug, Clone)]
struct Tree {
    namespaces: HashMap<NamespaceId, BTreeMap<Vec<u8>, Slot>>,
    next_id: i64,
}

impl Tree {
    fn new() -> Self {
        let mut tree = Self {
            namespaces: HashMap::new(),
            next_id: NamespaceId::ROOT.0 + 1,
        };
        tree.namespaces.insert(NamespaceId::ROOT, BTreeMap::new());
        for name in [KV, USER, META] {
            let id = tree.allocate();
            if let Some(root) = tree.namespaces.get_mut(&NamespaceId::ROOT) {
                root.insert(name.to_vec(), Slot::Child(id));
            }
        }
        tree
    }

    fn allocate(&mut self) -> NamespaceId {
        let id = NamespaceId(self.next_id);
        self.next_id += 1;
        self.namespaces.insert(id, BTreeMap::new());
        id
    }

    fn namespace(&self, id: NamespaceId) -> Result<&BTreeMap<Vec<u8>, Slot>, NamespaceError> {
        self.namespaces
            .get(&id)
            .ok_or(NamespaceError::UnknownHandle(id))
    }

    fn namespace_mut(
        &mut self,
        id: NamespaceId,
    ) -> Result<&mut BTreeMap<Vec<u8>, Slot>, NamespaceError> {
        self.namespaces
            .get_mut(&id)
            .ok_or(NamespaceError::UnknownHandle(id))
    }

    fn open_or_create_child(
        &mut self,
        parent: NamespaceId,
        name: &[u8],
    ) -> Result<NamespaceId, NamespaceError> {
        match self.namespace(parent)?.get(name) {
            Some(Slot::Child(id)) => return Ok(*id),
            Some(Slot::Value(_)) => return Err(NamespaceError::incompatible(name)),
            None => {}
        }
        let id = self.allocate();
        self.namespace_mut(parent)?
            .insert(name.to_vec(), Slot::Child(id));
        Ok(id)
    }

    fn put(&mut self, ns: NamespaceId, key: &[u8], value: &[u8]) -> Result<(), NamespaceError> {
        let namespace = self.namespace_mut(ns)?;
        if let Some(Slot::Child(_)) = namespace.get(key) {
            return Err(NamespaceError::incompatible(key));
        }
        namespace.insert(key.to_vec(), Slot::Value(value.to_vec()));
        Ok(())
    }

    fn delete_key(&mut self, ns: NamespaceId, key: &[u8]) -> Result<(), NamespaceError> {
        let namespace = self.namespace_mut(ns)?;
        match namespace.get(key) {
            Some(Slot::Child(_)) => Err(NamespaceError::incompatible(key)),
            Some(Slot::Value(_)) => {
                namespace.remove(key);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn delete_child(&mut self, ns: NamespaceId, name: &[u8]) -> Result<(), NamespaceError> {
        let namespace = self.namespace_mut(ns)?;
        let child = match namespace.get(name) {
            Some(Slot::Child(id)) => *id,
            Some(Slot::Value(_)) => return Err(NamespaceError::incompatible(name)),
            None => return Err(NamespaceError::not_found(name)),
        };
        namespace.remove(name);

        let mut pending = vec![child];
        while let Some(id) = pending.pop() {
            if let Some(removed) = self.namespaces.remove(&id) {
                pending.extend(removed.values().filter_map(|slot| match slot {
                    Slot::Child(id) => Some(*id),
                    Slot::Value(_) => None,
                }));
            }
        }
        Ok(())
    }
}

/// Namespace store held entirely in memory.
///
/// Writers work on a private copy of the tree that replaces the shared one on
/// commit, so a dropped write transaction leaves no trace.
///
/// Every write transaction copies the whole tree, values included, so write
/// cost grows with the total amount of stored data. Meant for tests and small
/// vaults; use the SQLite store for anything larger.
#[derive(Debug, Clone)]
pub struct MemoryNamespaceStore {
    inner: Arc<RwLock<Tree>>,
}

impl MemoryNamespaceStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Tree::new())),
        }
    }
}

impl Default for MemoryNamespaceStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Transaction over a [`MemoryNamespaceStore`]
pub struct MemoryTx(TxState);

enum TxState {
    Read(OwnedRwLockReadGuard<Tree>),
    Write {
        guard: OwnedRwLockWriteGuard<Tree>,
        working: Tree,
    },
}

impl MemoryTx {
    fn tree(&self) -> &Tree {
        match &self.0 {
            TxState::Read(guard) => &**guard,
            TxState::Write { working, .. } => working,
        }
    }

    fn tree_mut(&mut self) -> Result<&mut Tree, NamespaceError> {
        match &mut self.0 {
            TxState::Read(_) => Err(NamespaceError::ReadOnly),
            TxState::Write { working, .. } => Ok(working),
        }
    }
}

#[async_trait]
impl NamespaceStore for MemoryNamespaceStore {
    type Tx = MemoryTx;

    async fn begin_read(&self) -> Result<Self::Tx, NamespaceError> {
        Ok(MemoryTx(TxState::Read(
            self.inner.clone().read_owned().await,
        )))
    }

    async fn begin_write(&self) -> Result<Self::Tx, NamespaceError> {
        let guard = self.inner.clone().write_owned().await;
        // full copy of the tree
        let working = guard.clone();
        Ok(MemoryTx(TxState::Write { guard, working }))
    }
}

#[async_trait]
impl NamespaceTx for MemoryTx {
    fn is_writable(&self) -> bool {
        matches!(self.0, TxState::Write { .. })
    }

    async fn open_child(
        &mut self,
        parent: NamespaceId,
        name: &[u8],
    ) -> Result<Option<NamespaceId>, NamespaceError> {
        Ok(match self.tree().namespace(parent)?.get(name) {
            Some(Slot::Child(id)) => Some(*id),
            _ => None,
        })
    }

    async fn open_or_create_child(
        &mut self,
        parent: NamespaceId,
        name: &[u8],
    ) -> Result<NamespaceId, NamespaceError> {
        self.tree_mut()?.open_or_create_child(parent, name)
    }

    async fn get(
        &mut self,
        ns: NamespaceId,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>, NamespaceError> {
        Ok(match self.tree().namespace(ns)?.get(key) {
            Some(Slot::Value(value)) => Some(value.clone()),
            _ => None,
        })
    }

    async fn put(
        &mut self,
        ns: NamespaceId,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), NamespaceError> {
        self.tree_mut()?.put(ns, key, value)
    }

    async fn delete_key(&mut self, ns: NamespaceId, key: &[u8]) -> Result<(), NamespaceError> {
        self.tree_mut()?.delete_key(ns, key)
    }

    async fn delete_child(&mut self, ns: NamespaceId, name: &[u8]) -> Result<(), NamespaceError> {
        self.tree_mut()?.delete_child(ns, name)
    }

    async fn entries(
        &mut self,
        ns: NamespaceId,
    ) -> Result<Vec<(Vec<u8>, Entry)>, NamespaceError> {
        Ok(self
            .tree()
            .namespace(ns)?
            .iter()
            .map(|(name, slot)| {
                let entry = match slot {
                    Slot::Value(value) => Entry::Value(value.clone()),
                    Slot::Child(_) => Entry::Namespace,
                };
                (name.clone(), entry)
            })
            .collect())
    }

    async fn is_empty(&mut self, ns: NamespaceId) -> Result<bool, NamespaceError> {
        Ok(self.tree().namespace(ns)?.is_empty())
    }

    async fn commit(self) -> Result<(), NamespaceError> {
        match self.0 {
            TxState::Read(_) => Ok(()),
            TxState::Write { mut guard, working } => {
                *guard = working;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::open_top_level;

    #[tokio::test]
    async fn test_top_level_namespaces_exist() {
        let store = MemoryNamespaceStore::new();
        let mut tx = store.begin_read().await.unwrap();
        let names: Vec<Vec<u8>> = tx
            .entries(NamespaceId::ROOT)
            .await
            .unwrap()
            .into_iter()
            .map(|(name, entry)| {
                assert_eq!(entry, Entry::Namespace);
                name
            })
            .collect();
        assert_eq!(names, vec![KV.to_vec(), META.to_vec(), USER.to_vec()]);
        assert!(open_top_level(&mut tx, KV).await.is_ok());
        assert!(open_top_level(&mut tx, b"nope").await.is_err());
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let store = MemoryNamespaceStore::new();

        let mut tx = store.begin_write().await.unwrap();
        let kv = open_top_level(&mut tx, KV).await.unwrap();
        let alice = tx.open_or_create_child(kv, b"alice").await.unwrap();
        tx.put(alice, b"k", b"v").await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin_read().await.unwrap();
        let kv = open_top_level(&mut tx, KV).await.unwrap();
        let alice = tx.open_child(kv, b"alice").await.unwrap().unwrap();
        assert_eq!(tx.get(alice, b"k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_dropped_write_rolls_back() {
        let store = MemoryNamespaceStore::new();

        {
            let mut tx = store.begin_write().await.unwrap();
            let kv = open_top_level(&mut tx, KV).await.unwrap();
            tx.open_or_create_child(kv, b"alice").await.unwrap();
        }

        let mut tx = store.begin_read().await.unwrap();
        let kv = open_top_level(&mut tx, KV).await.unwrap();
        assert_eq!(tx.open_child(kv, b"alice").await.unwrap(), None);
        assert!(tx.is_empty(kv).await.unwrap());
    }

    #[tokio::test]
    async fn test_values_and_namespaces_are_exclusive() {
        let store = MemoryNamespaceStore::new();
        let mut tx = store.begin_write().await.unwrap();
        let kv = open_top_level(&mut tx, KV).await.unwrap();

        tx.put(kv, b"leaf", b"1").await.unwrap();
        tx.open_or_create_child(kv, b"branch").await.unwrap();

        assert!(matches!(
            tx.open_or_create_child(kv, b"leaf").await,
            Err(NamespaceError::IncompatibleValue(_))
        ));
        assert!(matches!(
            tx.put(kv, b"branch", b"2").await,
            Err(NamespaceError::IncompatibleValue(_))
        ));
        assert!(matches!(
            tx.delete_key(kv, b"branch").await,
            Err(NamespaceError::IncompatibleValue(_))
        ));
        assert!(matches!(
            tx.delete_child(kv, b"leaf").await,
            Err(NamespaceError::IncompatibleValue(_))
        ));
        assert_eq!(tx.get(kv, b"branch").await.unwrap(), None);
        assert_eq!(tx.open_child(kv, b"leaf").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_child_removes_subtree() {
        let store = MemoryNamespaceStore::new();
        let mut tx = store.begin_write().await.unwrap();
        let kv = open_top_level(&mut tx, KV).await.unwrap();
        let a = tx.open_or_create_child(kv, b"a").await.unwrap();
        let b = tx.open_or_create_child(a, b"b").await.unwrap();
        tx.put(b, b"k", b"v").await.unwrap();

        tx.delete_child(kv, b"a").await.unwrap();
        assert!(tx.is_empty(kv).await.unwrap());
        assert!(matches!(
            tx.get(b, b"k").await,
            Err(NamespaceError::UnknownHandle(_))
        ));
        assert!(matches!(
            tx.delete_child(kv, b"a").await,
            Err(NamespaceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_read_transaction_rejects_writes() {
        let store = MemoryNamespaceStore::new();
        let mut tx = store.begin_read().await.unwrap();
        assert!(!tx.is_writable());
        assert!(matches!(
            tx.put(NamespaceId::ROOT, b"k", b"v").await,
            Err(NamespaceError::ReadOnly)
        ));
        assert!(matches!(
            tx.open_or_create_child(NamespaceId::ROOT, b"x").await,
            Err(NamespaceError::ReadOnly)
        ));
    }

    #[tokio::test]
    async fn test_missing_key_delete_is_noop() {
        let store = MemoryNamespaceStore::new();
        let mut tx = store.begin_write().await.unwrap();
        let meta = open_top_level(&mut tx, META).await.unwrap();
        tx.delete_key(meta, b"absent").await.unwrap();
    }
}
