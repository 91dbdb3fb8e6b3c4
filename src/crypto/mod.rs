/// Arbitrary-precision modular arithmetic and bounded random sampling.
pub mod bigint;
/// Cryptographically secure random number generation.
pub mod rng;

pub use bigint::{mod_pow, random_in_range};
pub use rng::SecureRng;
