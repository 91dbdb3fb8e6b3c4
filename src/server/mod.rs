//! Verifier-side server: configuration, shared state, and the gRPC service.

pub mod config;
pub mod service;
pub mod state;

pub use config::{RateLimiter, ServerConfig};
pub use service::AuthServiceImpl;
pub use state::{ChallengeRecord, ServerState, SessionRecord, UserRecord};
