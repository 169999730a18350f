//! Namespace store backed by SQLite.
//!
//! Namespaces are rows of `namespaces`; each of their names is a row of
//! `entries` carrying either a `value` or a `child_id`. One namespace
//! transaction is one SQLite transaction, taken together with a process-wide
//! read/write guard so that writers are exclusive and readers never observe a
//! writer in flight.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Row, Sqlite, Transaction};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use common::namespace::{Entry, NamespaceError, NamespaceId, NamespaceStore, NamespaceTx};

use super::Database;

fn backend(err: sqlx::Error) -> NamespaceError {
    NamespaceError::Backend(anyhow::Error::new(err))
}

/// What a single name currently holds
enum Slot {
    Value,
    Child(NamespaceId),
}

#[derive(Debug, Clone)]
pub struct SqliteNamespaceStore {
    db: Database,
    lock: Arc<RwLock<()>>,
}

impl SqliteNamespaceStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            lock: Arc::new(RwLock::new(())),
        }
    }
}

#[allow(dead_code)]
enum Guard {
    Read(OwnedRwLockReadGuard<()>),
    Write(OwnedRwLockWriteGuard<()>),
}

pub struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
    writable: bool,
    _guard: Guard,
}

#[async_trait]
impl NamespaceStore for SqliteNamespaceStore {
    type Tx = SqliteTx;

    async fn begin_read(&self) -> Result<Self::Tx, NamespaceError> {
        let guard = Guard::Read(self.lock.clone().read_owned().await);
        let tx = self.db.begin().await.map_err(backend)?;
        Ok(SqliteTx {
            tx,
            writable: false,
            _guard: guard,
        })
    }

    async fn begin_write(&self) -> Result<Self::Tx, NamespaceError> {
        let guard = Guard::Write(self.lock.clone().write_owned().await);
        let tx = self.db.begin().await.map_err(backend)?;
        Ok(SqliteTx {
            tx,
            writable: true,
            _guard: guard,
        })
    }
}

impl SqliteTx {
    fn ensure_writable(&self) -> Result<(), NamespaceError> {
        if !self.writable {
            return Err(NamespaceError::ReadOnly);
        }
        Ok(())
    }

    async fn slot(&mut self, ns: NamespaceId, name: &[u8]) -> Result<Option<Slot>, NamespaceError> {
        let row = sqlx::query(
            r#"
            SELECT child_id FROM entries
            WHERE namespace_id = ? AND name = ?
            "#,
        )
        .bind(ns.0)
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(backend)?;

        Ok(row.map(|row| match row.get::<Option<i64>, _>("child_id") {
            Some(id) => Slot::Child(NamespaceId(id)),
            None => Slot::Value,
        }))
    }
}

#[async_trait]
impl NamespaceTx for SqliteTx {
    fn is_writable(&self) -> bool {
        self.writable
    }

    async fn open_child(
        &mut self,
        parent: NamespaceId,
        name: &[u8],
    ) -> Result<Option<NamespaceId>, NamespaceError> {
        Ok(match self.slot(parent, name).await? {
            Some(Slot::Child(id)) => Some(id),
            _ => None,
        })
    }

    async fn open_or_create_child(
        &mut self,
        parent: NamespaceId,
        name: &[u8],
    ) -> Result<NamespaceId, NamespaceError> {
        self.ensure_writable()?;
        match self.slot(parent, name).await? {
            Some(Slot::Child(id)) => return Ok(id),
            Some(Slot::Value) => {
                return Err(NamespaceError::IncompatibleValue(
                    String::from_utf8_lossy(name).into_owned(),
                ))
            }
            None => {}
        }

        let id = sqlx::query("INSERT INTO namespaces DEFAULT VALUES")
            .execute(&mut *self.tx)
            .await
            .map_err(backend)?
            .last_insert_rowid();

        sqlx::query(
            r#"
            INSERT INTO entries (namespace_id, name, child_id)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(parent.0)
        .bind(name)
        .bind(id)
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;

        Ok(NamespaceId(id))
    }

    async fn get(
        &mut self,
        ns: NamespaceId,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>, NamespaceError> {
        let row = sqlx::query(
            r#"
            SELECT value FROM entries
            WHERE namespace_id = ? AND name = ? AND value IS NOT NULL
            "#,
        )
        .bind(ns.0)
        .bind(key)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(backend)?;

        Ok(row.map(|row| row.get::<Vec<u8>, _>("value")))
    }

    async fn put(
        &mut self,
        ns: NamespaceId,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), NamespaceError> {
        self.ensure_writable()?;
        if let Some(Slot::Child(_)) = self.slot(ns, key).await? {
            return Err(NamespaceError::IncompatibleValue(
                String::from_utf8_lossy(key).into_owned(),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO entries (namespace_id, name, value)
            VALUES (?, ?, ?)
            ON CONFLICT (namespace_id, name) DO UPDATE SET
                value = excluded.value
            "#,
        )
        .bind(ns.0)
        .bind(key)
        .bind(value)
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn delete_key(&mut self, ns: NamespaceId, key: &[u8]) -> Result<(), NamespaceError> {
        self.ensure_writable()?;
        if let Some(Slot::Child(_)) = self.slot(ns, key).await? {
            return Err(NamespaceError::IncompatibleValue(
                String::from_utf8_lossy(key).into_owned(),
            ));
        }

        sqlx::query(
            r#"
            DELETE FROM entries
            WHERE namespace_id = ? AND name = ? AND child_id IS NULL
            "#,
        )
        .bind(ns.0)
        .bind(key)
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn delete_child(&mut self, ns: NamespaceId, name: &[u8]) -> Result<(), NamespaceError> {
        self.ensure_writable()?;
        let child = match self.slot(ns, name).await? {
            Some(Slot::Child(id)) => id,
            Some(Slot::Value) => {
                return Err(NamespaceError::IncompatibleValue(
                    String::from_utf8_lossy(name).into_owned(),
                ))
            }
            None => {
                return Err(NamespaceError::NotFound(
                    String::from_utf8_lossy(name).into_owned(),
                ))
            }
        };

        sqlx::query("DELETE FROM entries WHERE namespace_id = ? AND name = ?")
            .bind(ns.0)
            .bind(name)
            .execute(&mut *self.tx)
            .await
            .map_err(backend)?;

        // entries of the removed namespaces go with them through the cascade
        sqlx::query(
            r#"
            WITH RECURSIVE subtree (id) AS (
                SELECT ?
                UNION ALL
                SELECT e.child_id FROM entries e
                JOIN subtree s ON e.namespace_id = s.id
                WHERE e.child_id IS NOT NULL
            )
            DELETE FROM namespaces WHERE id IN (SELECT id FROM subtree)
            "#,
        )
        .bind(child.0)
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn entries(
        &mut self,
        ns: NamespaceId,
    ) -> Result<Vec<(Vec<u8>, Entry)>, NamespaceError> {
        let rows = sqlx::query(
            r#"
            SELECT name, value FROM entries
            WHERE namespace_id = ?
            ORDER BY name
            "#,
        )
        .bind(ns.0)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(backend)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let entry = match row.get::<Option<Vec<u8>>, _>("value") {
                    Some(value) => Entry::Value(value),
                    None => Entry::Namespace,
                };
                (row.get::<Vec<u8>, _>("name"), entry)
            })
            .collect())
    }

    async fn is_empty(&mut self, ns: NamespaceId) -> Result<bool, NamespaceError> {
        let row = sqlx::query("SELECT 1 FROM entries WHERE namespace_id = ? LIMIT 1")
            .bind(ns.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(backend)?;
        Ok(row.is_none())
    }

    async fn commit(self) -> Result<(), NamespaceError> {
        self.tx.commit().await.map_err(backend)
    }
}
