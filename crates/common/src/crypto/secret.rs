//! Symmetric keys and AES-256-GCM encryption
//!
//! Ciphertexts are laid out as `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
//! A fresh random nonce is drawn for every encryption.

use std::fmt;
use std::ops::Deref;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ErrorKind;

/// Size of an AES-GCM nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of an AES-256 key in bytes
pub const SECRET_SIZE: usize = 32;
/// Size of the GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Errors that can occur during encryption/decryption
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    #[error("invalid key size, expected {expected}, got {got}")]
    InvalidKeySize { expected: usize, got: usize },
    #[error("ciphertext too short: {0} bytes")]
    TooShort(usize),
    #[error("encrypt error")]
    Encrypt,
    #[error("decrypt error: authentication failed")]
    Decrypt,
    #[error("failed to generate random bytes: {0}")]
    Randomness(String),
}

impl SecretError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SecretError::InvalidKeySize { .. } => ErrorKind::Validation,
            SecretError::Randomness(_) => ErrorKind::Storage,
            _ => ErrorKind::Crypto,
        }
    }
}

/// Fill `buf` from the operating system's CSPRNG
pub fn random_bytes(buf: &mut [u8]) -> Result<(), SecretError> {
    getrandom::getrandom(buf).map_err(|e| SecretError::Randomness(e.to_string()))
}

/// A 256-bit symmetric key, wiped from memory on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret([u8; SECRET_SIZE]);

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

impl Deref for Secret {
    type Target = [u8; SECRET_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

impl Secret {
    /// Generate a new random secret using the system CSPRNG
    pub fn generate() -> Result<Self, SecretError> {
        let mut buff = [0; SECRET_SIZE];
        random_bytes(&mut buff)?;
        Ok(Self(buff))
    }

    /// Create a secret from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
        if data.len() != SECRET_SIZE {
            return Err(SecretError::InvalidKeySize {
                expected: SECRET_SIZE,
                got: data.len(),
            });
        }
        let mut buff = [0; SECRET_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Build an AEAD cipher keyed by this secret
    pub fn cipher(&self) -> Cipher {
        Cipher(Aes256Gcm::new(self.0.as_ref().into()))
    }
}

/// A keyed AES-256-GCM instance
#[derive(Clone)]
pub struct Cipher(Aes256Gcm);

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cipher(..)")
    }
}

impl Cipher {
    /// Build a cipher directly from raw key bytes
    ///
    /// # Errors
    ///
    /// Returns an error if `key` is not a 256-bit key.
    pub fn new(key: &[u8]) -> Result<Self, SecretError> {
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| SecretError::InvalidKeySize {
            expected: SECRET_SIZE,
            got: key.len(),
        })?;
        Ok(Self(cipher))
    }

    /// Encrypt `plaintext`, returning `nonce || ciphertext || tag`
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, SecretError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        random_bytes(&mut nonce_bytes)?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .0
            .encrypt(nonce, plaintext)
            .map_err(|_| SecretError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt `nonce || ciphertext || tag`
    ///
    /// # Errors
    ///
    /// Fails closed: truncated input or a tag mismatch returns an error and
    /// never any partial plaintext.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(SecretError::TooShort(data.len()));
        }
        let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
        self.0
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| SecretError::Decrypt)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let cipher = Secret::generate().unwrap().cipher();
        let data = b"hello world, this is a test message for encryption";

        let encrypted = cipher.encrypt(data).unwrap();
        assert_eq!(encrypted.len(), NONCE_SIZE + data.len() + TAG_SIZE);

        let decrypted = cipher.decrypt(&encrypted).unwrap();
        assert_eq!(data.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_fresh_nonce_per_encryption() {
        let cipher = Secret::generate().unwrap().cipher();
        let a = cipher.encrypt(b"same").unwrap();
        let b = cipher.encrypt(b"same").unwrap();
        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
    }

    #[test]
    fn test_any_flipped_byte_fails() {
        let cipher = Secret::generate().unwrap().cipher();
        let encrypted = cipher.encrypt(b"tamper evident").unwrap();

        for idx in 0..encrypted.len() {
            let mut corrupted = encrypted.clone();
            corrupted[idx] ^= 0x01;
            assert_eq!(cipher.decrypt(&corrupted), Err(SecretError::Decrypt));
        }
    }

    #[test]
    fn test_truncated_input() {
        let cipher = Secret::generate().unwrap().cipher();
        assert_eq!(cipher.decrypt(&[0u8; 4]), Err(SecretError::TooShort(4)));
        assert_eq!(
            cipher.decrypt(&[0u8; NONCE_SIZE]),
            Err(SecretError::TooShort(NONCE_SIZE))
        );
    }

    #[test]
    fn test_wrong_key_fails() {
        let encrypted = Secret::generate().unwrap().cipher().encrypt(b"x").unwrap();
        let other = Secret::generate().unwrap().cipher();
        assert_eq!(other.decrypt(&encrypted), Err(SecretError::Decrypt));
    }

    #[test]
    fn test_empty_plaintext() {
        let cipher = Secret::generate().unwrap().cipher();
        let encrypted = cipher.encrypt(b"").unwrap();
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_key_size_validation() {
        assert!(Secret::from_slice(&[1u8; 16]).is_err());
        assert!(Secret::from_slice(&[1u8; 64]).is_err());
        assert!(Secret::from_slice(&[1u8; SECRET_SIZE]).is_ok());

        assert_eq!(
            Cipher::new(&[0u8; 31]).unwrap_err(),
            SecretError::InvalidKeySize {
                expected: SECRET_SIZE,
                got: 31
            }
        );
        assert!(Cipher::new(&[0u8; SECRET_SIZE]).is_ok());
    }
}
