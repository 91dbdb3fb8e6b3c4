//! Prover-side helpers.
//!
//! Everything needed to drive a login from the client end of the wire:
//! deriving registration material from a secret, producing the Schnorr
//! commitment and response, and signing nonces under the ECDSA scheme. All
//! wire values are lowercase hex, matching what the server parses.

use num_bigint::BigUint;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::EncodePublicKey;
use zeroize::Zeroizing;

use crate::crypto::SecureRng;
use crate::scheme::SchnorrGroup;
use crate::{Error, Result};

/// Schnorr prover holding the long-term secret exponent `x`.
pub struct SchnorrProver {
    group: SchnorrGroup,
    secret: Zeroizing<Vec<u8>>,
}

/// An in-flight login attempt: the ephemeral `r` behind a submitted
/// commitment. Single use; consumed by [`SchnorrProver::respond`].
pub struct PendingCommitment {
    r: Zeroizing<Vec<u8>>,
}

impl SchnorrProver {
    /// Creates a prover with a freshly drawn secret exponent.
    pub fn generate(group: SchnorrGroup) -> Self {
        let mut rng = SecureRng::new();
        let x = group.random_exponent(&mut rng);
        Self {
            group,
            secret: Zeroizing::new(x.to_bytes_be()),
        }
    }

    /// Creates a prover from an existing secret exponent.
    pub fn from_secret(group: SchnorrGroup, x: &BigUint) -> Result<Self> {
        if x.bits() == 0 || *x >= *group.modulus() {
            return Err(Error::Validation("secret exponent out of range".into()));
        }
        Ok(Self {
            group,
            secret: Zeroizing::new(x.to_bytes_be()),
        })
    }

    fn secret_exponent(&self) -> BigUint {
        BigUint::from_bytes_be(&self.secret)
    }

    /// Hex-encoded public value `v = g^x mod p` for registration.
    pub fn registration_material(&self) -> String {
        let v = self.group.public_from_secret(&self.secret_exponent());
        hex::encode(v.to_bytes_be())
    }

    /// Starts a login attempt: draws a fresh `r` and returns the hex
    /// commitment `y1 = g^r mod p` alongside the pending state.
    pub fn commit(&self) -> (PendingCommitment, String) {
        let mut rng = SecureRng::new();
        let (r, y1) = self.group.commit(&mut rng);
        (
            PendingCommitment {
                r: Zeroizing::new(r.to_bytes_be()),
            },
            hex::encode(y1.to_bytes_be()),
        )
    }

    /// Answers the verifier exponent `c` (hex) with the hex response
    /// `y2 = r + c*x`, consuming the pending commitment.
    pub fn respond(&self, pending: PendingCommitment, c_hex: &str) -> Result<String> {
        let c_bytes =
            hex::decode(c_hex).map_err(|_| Error::Validation("challenge is not hex".into()))?;
        let c = BigUint::from_bytes_be(&c_bytes);
        if c.bits() == 0 {
            return Err(Error::Validation("challenge is zero".into()));
        }

        let r = BigUint::from_bytes_be(&pending.r);
        let y2 = SchnorrGroup::respond(&r, &c, &self.secret_exponent());
        Ok(hex::encode(y2.to_bytes_be()))
    }
}

/// ECDSA P-256 prover holding a signing key.
pub struct EcdsaProver {
    signing_key: SigningKey,
}

impl EcdsaProver {
    /// Creates a prover with a freshly generated keypair.
    pub fn generate() -> Self {
        let mut rng = SecureRng::new();
        Self {
            signing_key: SigningKey::random(&mut rng),
        }
    }

    /// Creates a prover from an existing signing key.
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// Hex-encoded SPKI DER export of the public key for registration.
    pub fn registration_material(&self) -> Result<String> {
        let spki = self
            .signing_key
            .verifying_key()
            .to_public_key_der()
            .map_err(|e| Error::Validation(format!("public key export failed: {e}")))?;
        Ok(hex::encode(spki.as_bytes()))
    }

    /// Signs the server-issued nonce (hex string as received on the wire)
    /// and returns the hex proof.
    ///
    /// The signed message is the ASCII hex text itself, which is what the
    /// server reconstructs from the stored nonce bytes.
    pub fn prove(&self, nonce_hex: &str) -> String {
        let signature: Signature = self.signing_key.sign(nonce_hex.as_bytes());
        hex::encode(signature.to_bytes())
    }
}
