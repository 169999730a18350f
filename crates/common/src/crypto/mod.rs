//! Cryptographic primitives for strongroom
//!
//! - **Secret sharing**: Shamir's threshold scheme over GF(256), used to split
//!   the master secret between key custodians
//! - **Encryption**: AES-256-GCM with a fresh random nonce per message, used
//!   both for the root key envelope and for every stored record

mod gf256;
pub mod shamir;
mod secret;

pub use secret::{random_bytes, Cipher, Secret, SecretError, NONCE_SIZE, SECRET_SIZE, TAG_SIZE};
pub use shamir::{combine, split, ShamirError};
