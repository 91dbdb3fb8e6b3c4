//! Error types for the authentication protocol.

/// Main error types for the library.
///
/// Proof-verification internals never surface through this type directly:
/// every failure inside the verifier collapses to [`Error::AuthenticationFailed`]
/// before it reaches a caller, so the error channel cannot be used as a
/// verification oracle. `Validation` and `Conflict` carry no secret-dependent
/// information and are surfaced specifically.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or missing input, rejected before any cryptographic work.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The identifier is already registered. Registration is immutable.
    #[error("Identifier '{0}' already registered")]
    Conflict(String),

    /// Unknown identifier, or no live challenge matches.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The challenge's expiry window has passed.
    #[error("Challenge expired")]
    ChallengeExpired,

    /// The challenge was already consumed by an earlier verification attempt.
    #[error("Challenge already consumed")]
    ChallengeConsumed,

    /// The submitted proof did not verify. Deliberately undifferentiated.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// The session token failed its integrity check.
    #[error("Invalid session token")]
    InvalidToken,

    /// The session token is past its validity window.
    #[error("Session token expired")]
    TokenExpired,

    /// Required configuration is missing or unusable. Fatal at startup.
    #[error("Server misconfigured: {0}")]
    Misconfigured(String),
}

/// Convenience result type used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
