//! Signed bearer tokens
//!
//! A token is `base64url(username).expiry.base64url(mac)` where `expiry` is a
//! unix timestamp in seconds and `mac` is HMAC-SHA256 over the first two
//! fields joined by a dot.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token key must not be empty")]
    EmptyKey,
}

pub struct TokenSigner {
    mac: HmacSha256,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl TokenSigner {
    pub fn new(key: &[u8], ttl: Duration) -> Result<Self, TokenError> {
        if key.is_empty() {
            return Err(TokenError::EmptyKey);
        }
        let mac = <HmacSha256 as Mac>::new_from_slice(key).map_err(|_| TokenError::EmptyKey)?;
        Ok(Self { mac, ttl })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, username: &str) -> String {
        self.issue_at(username, now())
    }

    /// Issue a token as if the current time were `issued_at`
    pub fn issue_at(&self, username: &str, issued_at: u64) -> String {
        let expiry = issued_at.saturating_add(self.ttl.as_secs());
        let payload = format!("{}.{}", URL_SAFE_NO_PAD.encode(username), expiry);

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let tag = mac.finalize().into_bytes();

        format!("{}.{}", payload, URL_SAFE_NO_PAD.encode(tag))
    }

    /// Check signature and expiry, returning the username
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, now())
    }

    pub fn verify_at(&self, token: &str, at: u64) -> Result<String, TokenError> {
        let (payload, tag) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (user, expiry) = payload.split_once('.').ok_or(TokenError::Malformed)?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&tag)
            .map_err(|_| TokenError::BadSignature)?;

        let expiry: u64 = expiry.parse().map_err(|_| TokenError::Malformed)?;
        if at >= expiry {
            return Err(TokenError::Expired);
        }

        let user = URL_SAFE_NO_PAD
            .decode(user)
            .map_err(|_| TokenError::Malformed)?;
        String::from_utf8(user).map_err(|_| TokenError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(b"0123456789abcdef", Duration::from_secs(60)).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let signer = signer();
        let token = signer.issue_at("alice", 1_000);
        assert_eq!(signer.verify_at(&token, 1_000).unwrap(), "alice");
        assert_eq!(signer.verify_at(&token, 1_059).unwrap(), "alice");
    }

    #[test]
    fn test_expired() {
        let signer = signer();
        let token = signer.issue_at("alice", 1_000);
        assert_eq!(signer.verify_at(&token, 1_060), Err(TokenError::Expired));
    }

    #[test]
    fn test_tampered_payload() {
        let signer = signer();
        let token = signer.issue_at("alice", 1_000);
        let forged = token.replacen(
            &URL_SAFE_NO_PAD.encode("alice"),
            &URL_SAFE_NO_PAD.encode("mallory"),
            1,
        );
        assert_eq!(
            signer.verify_at(&forged, 1_000),
            Err(TokenError::BadSignature)
        );

        let extended = token.replacen("1060", "9999", 1);
        assert_eq!(
            signer.verify_at(&extended, 1_000),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_other_key_rejected() {
        let token = signer().issue_at("alice", 1_000);
        let other = TokenSigner::new(b"another key", Duration::from_secs(60)).unwrap();
        assert_eq!(other.verify_at(&token, 1_000), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_malformed() {
        let signer = signer();
        assert_eq!(signer.verify_at("", 0), Err(TokenError::Malformed));
        assert_eq!(signer.verify_at("abc", 0), Err(TokenError::Malformed));
        assert_eq!(signer.verify_at("a.b", 0), Err(TokenError::Malformed));
        assert_eq!(signer.verify_at("a.b.!!", 0), Err(TokenError::Malformed));
    }

    #[test]
    fn test_empty_key() {
        assert_eq!(
            TokenSigner::new(b"", Duration::from_secs(1)).unwrap_err(),
            TokenError::EmptyKey
        );
    }
}
