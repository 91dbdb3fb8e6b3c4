//! Self-contained session tokens.
//!
//! A token asserts an identifier, its issuance time, and its expiry, and is
//! verifiable without any store lookup: the payload is stamped with
//! HMAC-SHA256 under a server-held secret. Logout is a client-local discard;
//! the server additionally keeps an optional per-token record for revocation
//! bookkeeping (see `server::state`), but validation never consults it.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Token format version prefix.
const TOKEN_VERSION: &str = "v1";

/// Default session validity window: 15 minutes.
pub const SESSION_TTL_SECONDS: u64 = 900;

/// Minimum accepted stamping secret length in bytes.
const MIN_SECRET_LEN: usize = 32;

/// A freshly minted session token with its remaining validity.
#[derive(Clone, Debug)]
pub struct SessionToken {
    /// Opaque bearer token string.
    pub token: String,
    /// Seconds until expiry.
    pub expires_in: u64,
}

/// Mints and validates self-contained bearer tokens.
#[derive(Clone)]
pub struct SessionKeeper {
    secret: Vec<u8>,
    ttl_seconds: u64,
}

impl SessionKeeper {
    /// Creates a keeper from the configured stamping secret.
    ///
    /// Fails with `Misconfigured` if the secret is shorter than 32 bytes;
    /// this is checked once at startup and is fatal, never retried.
    pub fn new(secret: &str, ttl_seconds: u64) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(Error::Misconfigured(format!(
                "session secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        Ok(Self {
            secret: secret.as_bytes().to_vec(),
            ttl_seconds,
        })
    }

    /// Issues a token asserting `identifier` for the configured window.
    ///
    /// Format: `v1.<payload hex>.<mac hex>` with payload
    /// `identifier|issued_at|expires_at`. Identifier validation upstream
    /// guarantees the separator cannot occur inside the identifier.
    pub fn mint(&self, identifier: &str) -> SessionToken {
        let issued_at = unix_now();
        let expires_at = issued_at.saturating_add(self.ttl_seconds);

        let payload = format!("{identifier}|{issued_at}|{expires_at}");
        let mac = self.stamp(payload.as_bytes());

        SessionToken {
            token: format!("{TOKEN_VERSION}.{}.{}", hex::encode(&payload), hex::encode(mac)),
            expires_in: self.ttl_seconds,
        }
    }

    /// Validates a token and returns the identifier it asserts.
    ///
    /// Fails `InvalidToken` on any structural or integrity problem and
    /// `TokenExpired` once the validity window has passed. The MAC compare is
    /// constant-time.
    pub fn validate(&self, token: &str) -> Result<String> {
        let mut parts = token.split('.');
        let (version, payload_hex, mac_hex) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(v), Some(p), Some(m), None) => (v, p, m),
                _ => return Err(Error::InvalidToken),
            };

        if version != TOKEN_VERSION {
            return Err(Error::InvalidToken);
        }

        let payload = hex::decode(payload_hex).map_err(|_| Error::InvalidToken)?;
        let mac = hex::decode(mac_hex).map_err(|_| Error::InvalidToken)?;

        let expected = self.stamp(&payload);
        if expected.ct_eq(&mac).unwrap_u8() != 1 {
            return Err(Error::InvalidToken);
        }

        let payload = String::from_utf8(payload).map_err(|_| Error::InvalidToken)?;
        let mut fields = payload.split('|');
        let (identifier, _issued_at, expires_at) =
            match (fields.next(), fields.next(), fields.next(), fields.next()) {
                (Some(id), Some(iat), Some(exp), None) => (id, iat, exp),
                _ => return Err(Error::InvalidToken),
            };

        let expires_at: u64 = expires_at.parse().map_err(|_| Error::InvalidToken)?;
        if unix_now() >= expires_at {
            return Err(Error::TokenExpired);
        }

        Ok(identifier.to_string())
    }

    fn stamp(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| unreachable!("System time is after UNIX_EPOCH"))
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keeper() -> SessionKeeper {
        SessionKeeper::new("0123456789abcdef0123456789abcdef", SESSION_TTL_SECONDS).unwrap()
    }

    #[test]
    fn mint_then_validate() {
        let keeper = keeper();
        let minted = keeper.mint("alice");

        assert_eq!(minted.expires_in, SESSION_TTL_SECONDS);
        assert_eq!(keeper.validate(&minted.token).unwrap(), "alice");
    }

    #[test]
    fn validation_is_stateless() {
        let keeper = keeper();
        let minted = keeper.mint("alice");

        let other = SessionKeeper::new("0123456789abcdef0123456789abcdef", 60).unwrap();
        assert_eq!(other.validate(&minted.token).unwrap(), "alice");
    }

    #[test]
    fn tampered_payload_rejected() {
        let keeper = keeper();
        let minted = keeper.mint("alice");

        let forged = keeper.mint("mallory");
        let mac = minted.token.rsplit('.').next().unwrap();
        let forged_payload = forged.token.split('.').nth(1).unwrap();
        let spliced = format!("v1.{forged_payload}.{mac}");

        assert!(matches!(keeper.validate(&spliced), Err(Error::InvalidToken)));
    }

    #[test]
    fn wrong_secret_rejected() {
        let keeper = keeper();
        let minted = keeper.mint("alice");

        let other = SessionKeeper::new("ffffffffffffffffffffffffffffffff", 900).unwrap();
        assert!(matches!(other.validate(&minted.token), Err(Error::InvalidToken)));
    }

    #[test]
    fn expired_token_rejected() {
        let keeper = SessionKeeper::new("0123456789abcdef0123456789abcdef", 0).unwrap();
        let minted = keeper.mint("alice");
        assert!(matches!(keeper.validate(&minted.token), Err(Error::TokenExpired)));
    }

    #[test]
    fn garbage_tokens_rejected() {
        let keeper = keeper();
        for token in ["", "v1", "v1.zz.zz", "v2.00.00", "v1.00.00.00"] {
            assert!(matches!(keeper.validate(token), Err(Error::InvalidToken)));
        }
    }

    #[test]
    fn short_secret_is_misconfiguration() {
        assert!(matches!(
            SessionKeeper::new("short", 900),
            Err(Error::Misconfigured(_))
        ));
    }
}
