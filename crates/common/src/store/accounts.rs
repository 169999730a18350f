use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::crypto::{random_bytes, SecretError};
use crate::error::ErrorKind;
use crate::namespace::{open_top_level, NamespaceError, NamespaceStore, NamespaceTx, USER};

const SALT_SIZE: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("username and password must not be empty")]
    EmptyCredentials,
    #[error("user already exists: {0}")]
    UserExists(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Secret(#[from] SecretError),
    #[error(transparent)]
    Namespace(#[from] NamespaceError),
}

impl AccountError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccountError::EmptyCredentials => ErrorKind::Validation,
            AccountError::UserExists(_) => ErrorKind::Conflict,
            AccountError::UserNotFound(_) => ErrorKind::NotFound,
            AccountError::InvalidCredentials => ErrorKind::Crypto,
            AccountError::Hash(_) => ErrorKind::Crypto,
            AccountError::Secret(e) => e.kind(),
            AccountError::Namespace(e) => e.kind(),
        }
    }
}

/// Username to argon2 password hash, kept in the `user` namespace
#[derive(Debug, Clone)]
pub struct Accounts<S> {
    store: S,
}

impl<S: NamespaceStore> Accounts<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create(&self, username: &str, password: &str) -> Result<(), AccountError> {
        if username.is_empty() || password.is_empty() {
            return Err(AccountError::EmptyCredentials);
        }

        let mut salt = [0u8; SALT_SIZE];
        random_bytes(&mut salt)?;
        let salt = SaltString::encode_b64(&salt).map_err(|e| AccountError::Hash(e.to_string()))?;
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AccountError::Hash(e.to_string()))?
            .to_string();

        let mut tx = self.store.begin_write().await?;
        let users = open_top_level(&mut tx, USER).await?;
        if tx.get(users, username.as_bytes()).await?.is_some() {
            return Err(AccountError::UserExists(username.to_string()));
        }
        tx.put(users, username.as_bytes(), hash.as_bytes()).await?;
        tx.commit().await?;

        tracing::info!(username, "created user");
        Ok(())
    }

    pub async fn verify(&self, username: &str, password: &str) -> Result<(), AccountError> {
        let stored = {
            let mut tx = self.store.begin_read().await?;
            let users = open_top_level(&mut tx, USER).await?;
            tx.get(users, username.as_bytes())
                .await?
                .ok_or_else(|| AccountError::UserNotFound(username.to_string()))?
        };

        let stored = String::from_utf8(stored).map_err(|e| AccountError::Hash(e.to_string()))?;
        let parsed = PasswordHash::new(&stored).map_err(|e| AccountError::Hash(e.to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AccountError::InvalidCredentials)
    }

    pub async fn exists(&self, username: &str) -> Result<bool, AccountError> {
        let mut tx = self.store.begin_read().await?;
        let users = open_top_level(&mut tx, USER).await?;
        Ok(tx.get(users, username.as_bytes()).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::MemoryNamespaceStore;

    #[tokio::test]
    async fn test_create_and_verify() {
        let accounts = Accounts::new(MemoryNamespaceStore::new());
        accounts.create("alice", "hunter2").await.unwrap();

        assert!(accounts.exists("alice").await.unwrap());
        accounts.verify("alice", "hunter2").await.unwrap();
        assert!(matches!(
            accounts.verify("alice", "hunter3").await,
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_and_unknown_users() {
        let accounts = Accounts::new(MemoryNamespaceStore::new());
        accounts.create("alice", "pw").await.unwrap();

        let err = accounts.create("alice", "other").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = accounts.verify("bob", "pw").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_empty_credentials() {
        let accounts = Accounts::new(MemoryNamespaceStore::new());
        assert!(matches!(
            accounts.create("", "pw").await,
            Err(AccountError::EmptyCredentials)
        ));
        assert!(matches!(
            accounts.create("alice", "").await,
            Err(AccountError::EmptyCredentials)
        ));
    }

    #[tokio::test]
    async fn test_password_is_not_stored_in_clear() {
        let store = MemoryNamespaceStore::new();
        Accounts::new(store.clone())
            .create("alice", "hunter2")
            .await
            .unwrap();

        let mut tx = store.begin_read().await.unwrap();
        let users = open_top_level(&mut tx, USER).await.unwrap();
        let stored = tx.get(users, b"alice").await.unwrap().unwrap();
        let stored = String::from_utf8(stored).unwrap();
        assert!(stored.starts_with("$argon2"));
        assert!(!stored.contains("hunter2"));
    }
}
