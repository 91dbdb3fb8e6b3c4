//! Pluggable proof schemes.
//!
//! The protocol contract is the same for every scheme: registration stores
//! public verification material, login-start issues a single-use challenge,
//! login-finish checks a proof against the material and the consumed
//! challenge. The scheme is selected per identifier at registration time and
//! recorded alongside the material.

/// ECDSA P-256 signature-based challenge-response.
pub mod ecdsa;
/// Schnorr discrete-log identification.
pub mod schnorr;

use num_bigint::BigUint;
use p256::ecdsa::VerifyingKey;

pub use schnorr::SchnorrGroup;

use crate::{Error, Result};

/// Proof scheme selected at registration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SchemeKind {
    /// Discrete-log Schnorr identification over a fixed `(p, g)` group.
    Schnorr,
    /// ECDSA P-256 signature over the issued nonce.
    EcdsaP256,
}

impl SchemeKind {
    /// Wire name of the scheme.
    pub fn name(self) -> &'static str {
        match self {
            Self::Schnorr => "schnorr",
            Self::EcdsaP256 => "ecdsa-p256",
        }
    }

    /// Parses a wire name.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "schnorr" => Ok(Self::Schnorr),
            "ecdsa-p256" => Ok(Self::EcdsaP256),
            other => Err(Error::Validation(format!(
                "unsupported proof scheme '{other}'"
            ))),
        }
    }
}

/// Parsed, validated public verification material.
///
/// Derived one-way from the corresponding secret; never itself secret, and
/// immutable once registered for a given identifier.
#[derive(Clone, Debug)]
pub enum VerificationMaterial {
    /// Schnorr public value `v = g^x mod p`.
    Schnorr { v: BigUint },
    /// ECDSA P-256 public key.
    EcdsaP256 { key: VerifyingKey },
}

impl VerificationMaterial {
    /// Parses hex-encoded wire material for the given scheme.
    ///
    /// Cheap structural checks run before any cryptographic parsing, and
    /// every rejection here is a `Validation` error: nothing secret-dependent
    /// has been examined yet.
    pub fn parse(scheme: SchemeKind, group: &SchnorrGroup, material: &str) -> Result<Self> {
        match scheme {
            SchemeKind::Schnorr => {
                if material.is_empty() || !material.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(Error::Validation(
                        "public value must be hex-encoded".to_string(),
                    ));
                }
                let bytes = hex::decode(material)
                    .map_err(|_| Error::Validation("public value must be hex-encoded".into()))?;
                let v = BigUint::from_bytes_be(&bytes);
                group.validate_element(&v)?;
                Ok(Self::Schnorr { v })
            }
            SchemeKind::EcdsaP256 => {
                let key = ecdsa::parse_public_key(material)?;
                Ok(Self::EcdsaP256 { key })
            }
        }
    }

    /// The scheme this material belongs to.
    pub fn scheme(&self) -> SchemeKind {
        match self {
            Self::Schnorr { .. } => SchemeKind::Schnorr,
            Self::EcdsaP256 { .. } => SchemeKind::EcdsaP256,
        }
    }
}

/// Checks a submitted proof against registered material and the data of an
/// already-consumed challenge.
///
/// Pure given its inputs: no hidden state and no side effects beyond the
/// caller's bookkeeping. Every failure mode (wrong value, malformed proof,
/// missing challenge component) collapses to `AuthenticationFailed`, so the
/// result carries one bit.
///
/// For the Schnorr scheme the challenge supplies the commitment `y1`
/// (submitted before `c` was chosen) and the exponent `c`; the proof bytes
/// are the big-endian response `y2`. For the signature scheme the message is
/// the ASCII hex encoding of the nonce, matching what the registering client
/// signs.
pub fn verify_login_proof(
    group: &SchnorrGroup,
    material: &VerificationMaterial,
    nonce: &[u8],
    commitment: Option<&BigUint>,
    exponent: Option<&BigUint>,
    proof: &[u8],
) -> Result<()> {
    let ok = match material {
        VerificationMaterial::Schnorr { v } => match (commitment, exponent) {
            (Some(y1), Some(c)) => {
                let y2 = BigUint::from_bytes_be(proof);
                !proof.is_empty() && group.verify(v, y1, c, &y2)
            }
            _ => false,
        },
        VerificationMaterial::EcdsaP256 { key } => {
            let message = hex::encode(nonce);
            ecdsa::verify_signature(key, message.as_bytes(), proof)
        }
    };

    if ok {
        Ok(())
    } else {
        Err(Error::AuthenticationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_names_round_trip() {
        for kind in [SchemeKind::Schnorr, SchemeKind::EcdsaP256] {
            assert_eq!(SchemeKind::parse(kind.name()).unwrap(), kind);
        }
        assert!(SchemeKind::parse("rsa").is_err());
    }

    #[test]
    fn schnorr_material_parsing() {
        let group = SchnorrGroup::demo();

        let v = group.public_from_secret(&BigUint::from(17u32));
        let material = hex::encode(v.to_bytes_be());
        match VerificationMaterial::parse(SchemeKind::Schnorr, &group, &material).unwrap() {
            VerificationMaterial::Schnorr { v: parsed } => assert_eq!(parsed, v),
            other => panic!("unexpected material: {other:?}"),
        }

        // Out-of-range element and non-hex input are rejected up front.
        let too_big = hex::encode(BigUint::from(5000u32).to_bytes_be());
        assert!(VerificationMaterial::parse(SchemeKind::Schnorr, &group, &too_big).is_err());
        assert!(VerificationMaterial::parse(SchemeKind::Schnorr, &group, "not-hex").is_err());
        assert!(VerificationMaterial::parse(SchemeKind::Schnorr, &group, "").is_err());
    }

    #[test]
    fn missing_schnorr_challenge_parts_fail_closed() {
        let group = SchnorrGroup::demo();
        let v = group.public_from_secret(&BigUint::from(17u32));
        let material = VerificationMaterial::Schnorr { v };

        let err = verify_login_proof(&group, &material, b"nonce", None, None, &[1, 2, 3])
            .unwrap_err();
        assert!(matches!(err, Error::AuthenticationFailed));
    }

    #[test]
    fn empty_schnorr_proof_fails() {
        let group = SchnorrGroup::demo();
        let v = group.public_from_secret(&BigUint::from(17u32));
        let material = VerificationMaterial::Schnorr { v };
        let y1 = BigUint::from(1u32);
        let c = BigUint::from(9u32);

        let err = verify_login_proof(&group, &material, b"nonce", Some(&y1), Some(&c), &[])
            .unwrap_err();
        assert!(matches!(err, Error::AuthenticationFailed));
    }
}
