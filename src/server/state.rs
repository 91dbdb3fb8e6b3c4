use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use num_bigint::BigUint;
use tokio::sync::RwLock;

use crate::scheme::VerificationMaterial;
use crate::{Error, Result};

/// Challenge validity window in seconds.
pub const CHALLENGE_EXPIRY_SECONDS: u64 = 300;

const MAX_TOTAL_USERS: usize = 10_000;
const MAX_TOTAL_SESSIONS: usize = 100_000;

/// Registered principal data. Immutable once stored.
#[derive(Clone, Debug)]
pub struct UserRecord {
    /// Unique identifier for the principal.
    pub identifier: String,
    /// Parsed public verification material, tagged with its scheme.
    pub material: VerificationMaterial,
    /// Unix timestamp of registration.
    pub registered_at: u64,
}

/// A challenge bound to one identifier and one login attempt.
///
/// At most one live challenge exists per identifier; issuing a new one
/// replaces the record wholesale, so a superseded challenge can never be
/// consumed.
#[derive(Clone, Debug)]
pub struct ChallengeRecord {
    /// Identifier this challenge is bound to.
    pub identifier: String,
    /// Single-use nonce (>= 256 bits of entropy).
    pub nonce: Vec<u8>,
    /// Verifier-chosen exponent `c` (Schnorr scheme only).
    pub exponent: Option<BigUint>,
    /// Prover commitment `y1`, submitted before `c` was chosen (Schnorr only).
    pub commitment: Option<BigUint>,
    /// Unix timestamp when the challenge was created.
    pub created_at: u64,
    /// Unix timestamp when the challenge expires.
    pub expires_at: u64,
    /// Set on the first verification attempt, success or failure.
    pub consumed: bool,
}

impl ChallengeRecord {
    /// Creates a challenge record with automatic expiry calculation.
    pub fn new(
        identifier: String,
        nonce: Vec<u8>,
        exponent: Option<BigUint>,
        commitment: Option<BigUint>,
    ) -> Self {
        let created_at = unix_now();
        let expires_at = created_at.saturating_add(CHALLENGE_EXPIRY_SECONDS);

        Self {
            identifier,
            nonce,
            exponent,
            commitment,
            created_at,
            expires_at,
            consumed: false,
        }
    }

    /// Checks if the challenge has expired.
    ///
    /// Returns true if either the expiry timestamp has been reached OR if the
    /// challenge age exceeds twice the expiry duration (to handle clock skew).
    pub fn is_expired(&self) -> bool {
        let now = unix_now();
        let max_duration = 2 * CHALLENGE_EXPIRY_SECONDS;
        let age = now.saturating_sub(self.created_at);

        now >= self.expires_at || age >= max_duration
    }
}

/// Server-side session record, kept for revocation bookkeeping and operator
/// visibility. Token validation itself is stateless (see `session`).
#[derive(Clone, Debug)]
pub struct SessionRecord {
    /// The bearer token string.
    pub token: String,
    /// Identifier the session belongs to.
    pub identifier: String,
    /// Unix timestamp when the session was created.
    pub created_at: u64,
    /// Unix timestamp when the session expires.
    pub expires_at: u64,
}

impl SessionRecord {
    /// Creates a session record expiring `ttl_seconds` from now.
    pub fn new(token: String, identifier: String, ttl_seconds: u64) -> Self {
        let created_at = unix_now();
        Self {
            token,
            identifier,
            created_at,
            expires_at: created_at.saturating_add(ttl_seconds),
        }
    }

    /// Checks if the session has expired.
    pub fn is_expired(&self) -> bool {
        unix_now() >= self.expires_at
    }
}

/// Shared server state: key registry, live challenges, session records.
///
/// All maps are keyed by identifier (challenges) or token (sessions); no
/// operation needs cross-identifier coordination, and every state transition
/// happens under a single write lock on the map it touches.
pub struct ServerState {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
    challenges: Arc<RwLock<HashMap<String, ChallengeRecord>>>,
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl ServerState {
    /// Creates new server state with empty registries.
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            challenges: Arc::new(RwLock::new(HashMap::new())),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers a new principal.
    ///
    /// Linearizable per identifier: the presence check and the insert happen
    /// under one write lock, so concurrent registrations of the same
    /// identifier yield exactly one success and the rest `Conflict`.
    pub async fn register_user(&self, record: UserRecord) -> Result<()> {
        let mut users = self.users.write().await;

        if users.len() >= MAX_TOTAL_USERS {
            return Err(Error::Validation(format!(
                "server has reached maximum user capacity ({MAX_TOTAL_USERS})"
            )));
        }

        if users.contains_key(&record.identifier) {
            return Err(Error::Conflict(record.identifier));
        }

        users.insert(record.identifier.clone(), record);
        Ok(())
    }

    /// Retrieves a registered principal by identifier. Pure read.
    pub async fn get_user(&self, identifier: &str) -> Option<UserRecord> {
        let users = self.users.read().await;
        users.get(identifier).cloned()
    }

    /// Installs a fresh challenge for the identifier, unconditionally
    /// superseding any previous live one (last-issued wins).
    ///
    /// Returns the expiry timestamp in seconds since the UNIX epoch.
    pub async fn put_challenge(&self, record: ChallengeRecord) -> u64 {
        let expires_at = record.expires_at;
        let mut challenges = self.challenges.write().await;
        challenges.insert(record.identifier.clone(), record);
        expires_at
    }

    /// Atomically transitions the matching live challenge to spent and
    /// returns it for verification.
    ///
    /// This is the single point where a challenge leaves the live state.
    /// Exactly one caller can win the transition: the consumed flag is
    /// checked and set under one write lock, so a concurrent duplicate
    /// submission observes `ChallengeConsumed` rather than the challenge
    /// data. A nonce that does not match the current record belongs to a
    /// superseded (or never-issued) challenge and fails `NotFound`.
    pub async fn consume_challenge(&self, identifier: &str, nonce: &[u8]) -> Result<ChallengeRecord> {
        let mut challenges = self.challenges.write().await;

        let record = challenges
            .get_mut(identifier)
            .ok_or_else(|| Error::NotFound("no live challenge".to_string()))?;

        if record.nonce != nonce {
            return Err(Error::NotFound("no live challenge".to_string()));
        }

        if record.consumed {
            return Err(Error::ChallengeConsumed);
        }

        if record.is_expired() {
            challenges.remove(identifier);
            return Err(Error::ChallengeExpired);
        }

        record.consumed = true;
        Ok(record.clone())
    }

    /// Removes expired and spent challenges.
    pub async fn cleanup_expired_challenges(&self) {
        let mut challenges = self.challenges.write().await;
        challenges.retain(|_, record| !record.consumed && !record.is_expired());
    }

    /// Records a minted session for revocation bookkeeping.
    pub async fn record_session(&self, record: SessionRecord) -> Result<()> {
        let mut sessions = self.sessions.write().await;

        if sessions.len() >= MAX_TOTAL_SESSIONS {
            return Err(Error::Validation(format!(
                "server has reached maximum session capacity ({MAX_TOTAL_SESSIONS})"
            )));
        }

        sessions.insert(record.token.clone(), record);
        Ok(())
    }

    /// Drops a session record.
    pub async fn revoke_session(&self, token: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .remove(token)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound("session not found".to_string()))
    }

    /// Removes expired session records.
    pub async fn cleanup_expired_sessions(&self) {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, record| !record.is_expired());
    }

    /// Returns the number of registered principals.
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    /// Returns the number of tracked challenges.
    pub async fn challenge_count(&self) -> usize {
        self.challenges.read().await.len()
    }

    /// Returns the number of tracked sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ServerState {
    fn clone(&self) -> Self {
        Self {
            users: Arc::clone(&self.users),
            challenges: Arc::clone(&self.challenges),
            sessions: Arc::clone(&self.sessions),
        }
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
    use crate::scheme::{SchnorrGroup, VerificationMaterial};

    fn user(identifier: &str) -> UserRecord {
        let group = SchnorrGroup::demo();
        UserRecord {
            identifier: identifier.to_string(),
            material: VerificationMaterial::Schnorr {
                v: group.public_from_secret(&BigUint::from(17u32)),
            },
            registered_at: 0,
        }
    }

    fn challenge(identifier: &str, nonce: &[u8]) -> ChallengeRecord {
        ChallengeRecord::new(identifier.to_string(), nonce.to_vec(), None, None)
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let state = ServerState::new();
        state.register_user(user("alice")).await.unwrap();

        let err = state.register_user(user("alice")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(state.user_count().await, 1);
    }

    #[tokio::test]
    async fn consume_is_single_use() {
        let state = ServerState::new();
        state.put_challenge(challenge("alice", b"nonce-1")).await;

        state.consume_challenge("alice", b"nonce-1").await.unwrap();
        let err = state.consume_challenge("alice", b"nonce-1").await.unwrap_err();
        assert!(matches!(err, Error::ChallengeConsumed));
    }

    #[tokio::test]
    async fn superseded_challenge_is_unconsumable() {
        let state = ServerState::new();
        state.put_challenge(challenge("alice", b"nonce-1")).await;
        state.put_challenge(challenge("alice", b"nonce-2")).await;

        let err = state.consume_challenge("alice", b"nonce-1").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        state.consume_challenge("alice", b"nonce-2").await.unwrap();
    }

    #[tokio::test]
    async fn expired_challenge_fails_consume() {
        let state = ServerState::new();
        let mut record = challenge("alice", b"nonce-1");
        record.expires_at = record.created_at;
        state.put_challenge(record).await;

        let err = state.consume_challenge("alice", b"nonce-1").await.unwrap_err();
        assert!(matches!(err, Error::ChallengeExpired));
        assert_eq!(state.challenge_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_identifier_fails_consume() {
        let state = ServerState::new();
        let err = state.consume_challenge("nobody", b"nonce").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn concurrent_consume_has_one_winner() {
        let state = ServerState::new();
        state.put_challenge(challenge("alice", b"nonce-1")).await;

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let state = state.clone();
            tasks.push(tokio::spawn(async move {
                state.consume_challenge("alice", b"nonce-1").await
            }));
        }

        let mut wins = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn cleanup_drops_spent_and_expired() {
        let state = ServerState::new();
        state.put_challenge(challenge("alice", b"nonce-1")).await;
        state.put_challenge(challenge("bob", b"nonce-2")).await;

        state.consume_challenge("alice", b"nonce-1").await.unwrap();
        state.cleanup_expired_challenges().await;

        assert_eq!(state.challenge_count().await, 1);
    }

    #[tokio::test]
    async fn session_bookkeeping() {
        let state = ServerState::new();
        state
            .record_session(SessionRecord::new("tok".into(), "alice".into(), 900))
            .await
            .unwrap();
        assert_eq!(state.session_count().await, 1);

        state.revoke_session("tok").await.unwrap();
        assert_eq!(state.session_count().await, 0);
        assert!(state.revoke_session("tok").await.is_err());
    }

    #[tokio::test]
    async fn expired_sessions_are_cleaned_up() {
        let state = ServerState::new();
        state
            .record_session(SessionRecord::new("tok".into(), "alice".into(), 0))
            .await
            .unwrap();

        state.cleanup_expired_sessions().await;
        assert_eq!(state.session_count().await, 0);
    }
}
