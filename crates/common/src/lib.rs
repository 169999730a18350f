/**
 * Cryptographic types and operations.
 *  - Shamir secret sharing over GF(256)
 *  - AES-256-GCM secrets and ciphers
 */
pub mod crypto;
/**
 * Error classification shared by every
 *  component, used by transports to pick
 *  status codes and retry behaviour.
 */
pub mod error;
/**
 * Envelope key management: turns a
 *  reconstructed master secret into the
 *  root key that encrypts every record.
 */
pub mod keyring;
/**
 * Contract for the transactional nested
 *  namespace store everything persists to,
 *  plus an in-memory implementation.
 */
pub mod namespace;
/**
 * Seal / unseal lifecycle and the ceremony
 *  that mints and distributes new master
 *  secret shares.
 */
pub mod seal;
/**
 * Hierarchical encrypted secret storage
 *  and user accounts.
 */
pub mod store;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::crypto::{Cipher, Secret, SecretError};
    pub use crate::error::ErrorKind;
    pub use crate::keyring::{Keyring, KeyringError};
    pub use crate::namespace::{
        Entry, MemoryNamespaceStore, NamespaceError, NamespaceId, NamespaceStore, NamespaceTx,
    };
    pub use crate::seal::{GenerationReport, SealStatus, ShareDelivery, Vault, VaultError};
    pub use crate::store::{
        AccountError, Accounts, BucketInfo, BucketTree, Prefix, Record, SecretStore, StoreError,
    };
    pub use crate::version::build_info;
}
