//! Passwordless challenge-response authentication over gRPC.
//!
//! A prover registers public verification material once, then authenticates
//! by answering single-use server challenges: either a Schnorr discrete-log
//! identification round over a fixed prime-order group, or an ECDSA P-256
//! signature over the issued nonce. Both schemes share one protocol surface
//! (register, login-start, login-finish, whoami) and one state machine for
//! challenge issuance, consumption, and expiry.
//!
//! Successful logins mint self-contained HMAC-stamped bearer tokens; see
//! [`session`]. The server half lives in [`server`], prover helpers in
//! [`client`].

pub mod client;
pub mod crypto;
mod error;
pub mod scheme;
pub mod server;
pub mod session;

/// Generated protocol buffer definitions.
pub mod proto {
    tonic::include_proto!("zkauth");
}

pub use client::{EcdsaProver, SchnorrProver};
pub use crypto::SecureRng;
pub use error::{Error, Result};
pub use scheme::{SchemeKind, SchnorrGroup, VerificationMaterial};
pub use session::{SessionKeeper, SessionToken};
