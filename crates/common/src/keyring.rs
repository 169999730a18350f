//! Envelope key management
//!
//! The master secret reconstructed from shares is never used on data. It is
//! turned into a wrapping key that protects a random root key, persisted as
//! an envelope under `meta/root_key`. Records are encrypted with the root key,
//! so re-splitting the master secret only re-wraps the envelope.

use zeroize::Zeroizing;

use crate::crypto::{Cipher, Secret, SecretError, NONCE_SIZE, SECRET_SIZE, TAG_SIZE};
use crate::error::ErrorKind;
use crate::namespace::{open_top_level, NamespaceError, NamespaceStore, NamespaceTx, META};

/// Key of the root key envelope inside the meta namespace
pub const ROOT_KEY: &[u8] = b"root_key";
/// Key of the threshold agreed in the last generation ceremony
pub const THRESHOLD: &[u8] = b"threshold";
/// Byte length of a well-formed root key envelope
pub const ENVELOPE_SIZE: usize = NONCE_SIZE + SECRET_SIZE + TAG_SIZE;

#[derive(Debug, thiserror::Error)]
pub enum KeyringError {
    #[error(transparent)]
    Secret(#[from] SecretError),
    #[error(transparent)]
    Namespace(#[from] NamespaceError),
    #[error("root key envelope is corrupt: expected {ENVELOPE_SIZE} bytes, found {0}")]
    CorruptEnvelope(usize),
}

impl KeyringError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeyringError::Secret(e) => e.kind(),
            KeyringError::Namespace(e) => e.kind(),
            KeyringError::CorruptEnvelope(_) => ErrorKind::Storage,
        }
    }
}

/// Build the cipher that wraps the root key directly from the master secret
pub fn derive_wrapping_key(secret: &[u8]) -> Result<Cipher, KeyringError> {
    Ok(Cipher::new(secret)?)
}

/// Reads and writes the root key envelope and ceremony metadata
#[derive(Debug, Clone)]
pub struct Keyring<S> {
    store: S,
}

impl<S: NamespaceStore> Keyring<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Recover the root key with the given master secret, creating it on the
    /// very first unseal.
    ///
    /// A secret that does not match the one the envelope was sealed with
    /// fails authentication with [`SecretError::Decrypt`].
    pub async fn unseal(&self, secret: &[u8]) -> Result<Secret, KeyringError> {
        let wrapping = derive_wrapping_key(secret)?;

        let mut tx = self.store.begin_write().await?;
        let meta = open_top_level(&mut tx, META).await?;

        match tx.get(meta, ROOT_KEY).await? {
            None => {
                let root_key = Secret::generate()?;
                let envelope = wrapping.encrypt(root_key.bytes())?;
                tx.put(meta, ROOT_KEY, &envelope).await?;
                tx.commit().await?;
                tracing::info!("created new root key");
                Ok(root_key)
            }
            Some(envelope) if envelope.len() == ENVELOPE_SIZE => {
                let plaintext = Zeroizing::new(wrapping.decrypt(&envelope)?);
                Ok(Secret::from_slice(&plaintext)?)
            }
            Some(envelope) => Err(KeyringError::CorruptEnvelope(envelope.len())),
        }
    }

    /// Re-encrypt the root key under a new master secret
    pub async fn rewrap(&self, root_key: &Secret, new_secret: &[u8]) -> Result<(), KeyringError> {
        let wrapping = derive_wrapping_key(new_secret)?;
        let envelope = wrapping.encrypt(root_key.bytes())?;

        let mut tx = self.store.begin_write().await?;
        let meta = open_top_level(&mut tx, META).await?;
        tx.put(meta, ROOT_KEY, &envelope).await?;
        tx.commit().await?;
        tracing::info!("root key re-wrapped under new master secret");
        Ok(())
    }

    /// Whether a root key envelope has been written
    pub async fn is_initialized(&self) -> Result<bool, KeyringError> {
        let mut tx = self.store.begin_read().await?;
        let meta = open_top_level(&mut tx, META).await?;
        Ok(tx.get(meta, ROOT_KEY).await?.is_some())
    }

    pub async fn threshold(&self) -> Result<Option<u8>, KeyringError> {
        let mut tx = self.store.begin_read().await?;
        let meta = open_top_level(&mut tx, META).await?;
        Ok(match tx.get(meta, THRESHOLD).await? {
            Some(value) if value.len() == 1 => Some(value[0]),
            _ => None,
        })
    }

    pub async fn set_threshold(&self, threshold: u8) -> Result<(), KeyringError> {
        let mut tx = self.store.begin_write().await?;
        let meta = open_top_level(&mut tx, META).await?;
        tx.put(meta, THRESHOLD, &[threshold]).await?;
        tx.commit().await?;
        Ok(())
    }
}
