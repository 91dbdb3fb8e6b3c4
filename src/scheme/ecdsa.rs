//! ECDSA P-256 challenge-response scheme.
//!
//! The registered material is an exported public key; the proof for a login
//! attempt is a signature over the server-issued nonce, verified under
//! ECDSA/SHA-256. This substitutes unforgeability of the signature scheme for
//! the proof-of-knowledge primitive. It reveals no secret, but it is not a
//! zero-knowledge proof of a discrete-log relation and is documented as a
//! distinct scheme rather than conflated with the Schnorr variant.

use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;

use crate::{Error, Result};

/// Minimum accepted hex length for registered public key material.
///
/// An SPKI DER export of a P-256 key is 91 bytes (182 hex chars); the floor
/// rejects obviously malformed input before any parsing work.
pub const MIN_PUBLIC_KEY_HEX_LEN: usize = 100;

/// Parses registered public key material from its hex encoding.
///
/// Accepts an SPKI DER export (the browser `exportKey("spki")` format) or a
/// raw SEC1 point. Rejection here is a validation error: no signature has
/// been looked at yet.
pub fn parse_public_key(material: &str) -> Result<VerifyingKey> {
    if material.len() < MIN_PUBLIC_KEY_HEX_LEN || !material.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(Error::Validation("invalid public key format".to_string()));
    }

    let der = hex::decode(material)
        .map_err(|_| Error::Validation("invalid public key format".to_string()))?;

    VerifyingKey::from_public_key_der(&der)
        .or_else(|_| {
            VerifyingKey::from_sec1_bytes(&der)
                .map_err(|_| Error::Validation("unparseable public key".to_string()))
        })
}

/// Verifies a signature over `message` under the registered key.
///
/// Accepts the 64-byte raw `r || s` form produced by WebCrypto as well as
/// ASN.1 DER. Any parse or verification failure is reported uniformly as
/// `false`; the caller maps it to the undifferentiated authentication
/// failure.
pub fn verify_signature(key: &VerifyingKey, message: &[u8], signature: &[u8]) -> bool {
    let parsed = Signature::from_slice(signature).or_else(|_| Signature::from_der(signature));

    match parsed {
        Ok(sig) => key.verify(message, &sig).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use p256::ecdsa::signature::Signer;
    use p256::ecdsa::SigningKey;
    use p256::pkcs8::EncodePublicKey;

    use super::*;
    use crate::crypto::SecureRng;

    fn keypair() -> (SigningKey, String) {
        let mut rng = SecureRng::new();
        let signing = SigningKey::random(&mut rng);
        let spki = signing
            .verifying_key()
            .to_public_key_der()
            .expect("SPKI export");
        (signing, hex::encode(spki.as_bytes()))
    }

    #[test]
    fn spki_round_trip_and_verify() {
        let (signing, material) = keypair();
        let key = parse_public_key(&material).unwrap();

        let message = b"a3f1-nonce";
        let signature: Signature = signing.sign(message);

        assert!(verify_signature(&key, message, &signature.to_bytes()));
        assert!(verify_signature(&key, message, signature.to_der().as_bytes()));
    }

    #[test]
    fn wrong_key_rejected() {
        let (signing, _) = keypair();
        let (_, other_material) = keypair();
        let other_key = parse_public_key(&other_material).unwrap();

        let message = b"a3f1-nonce";
        let signature: Signature = signing.sign(message);

        assert!(!verify_signature(&other_key, message, &signature.to_bytes()));
    }

    #[test]
    fn wrong_message_rejected() {
        let (signing, material) = keypair();
        let key = parse_public_key(&material).unwrap();

        let signature: Signature = signing.sign(b"nonce-one");
        assert!(!verify_signature(&key, b"nonce-two", &signature.to_bytes()));
    }

    #[test]
    fn garbage_signature_rejected() {
        let (_, material) = keypair();
        let key = parse_public_key(&material).unwrap();
        assert!(!verify_signature(&key, b"nonce", &[0u8; 7]));
    }

    #[test]
    fn malformed_material_is_validation_error() {
        assert!(parse_public_key("").is_err());
        assert!(parse_public_key("abcd").is_err());
        assert!(parse_public_key(&"zz".repeat(60)).is_err());
        assert!(parse_public_key(&"ab".repeat(60)).is_err());
    }
}
