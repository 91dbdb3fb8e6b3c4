//! Schnorr identification over a multiplicative group of integers modulo a
//! prime.
//!
//! The prover knows `x` with `v = g^x mod p`. A login attempt commits to
//! `y1 = g^r mod p`, receives the verifier-chosen exponent `c`, and responds
//! with `y2 = r + c*x` (over the integers; the verification congruence
//! `g^y2 = y1 * v^c (mod p)` holds regardless of any reduction of `y2`).

use num_bigint::BigUint;
use num_traits::One;
use rand_core::CryptoRngCore;

use crate::crypto::{mod_pow, random_in_range};
use crate::{Error, Result};

/// A fixed public Schnorr group `(p, g)`.
///
/// The group is a protocol parameter, agreed out of band; it is never chosen
/// per user or transmitted on the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SchnorrGroup {
    p: BigUint,
    g: BigUint,
}

/// 2048-bit MODP prime from RFC 5114 section 2.3.
const MODP_2048_P: &str = "87A8E61DB4B6663CFFBBD19C651959998CEEF608660DD0F25D2CEED4435E3B00\
E00DF8F1D61957D4FAF7DF4561B2AA3016C3D91134096FAA3BF4296D830E9A7C209E0C6497517ABD5A8A9D30\
6BCF67ED91F9E6725B4758C022E0B1EF4275BF7B6C5BFC11D45F9088B941F54EB1E59BB8BC39A0BF12307F5C\
4FDB70C581B23F76B63ACAE1CAA6B7902D52526735488A0EF13C6D9A51BFA4AB3AD8347796524D8EF6A167B5\
A41825D967E144E5140564251CCACB83E6B486F6B3CA3F7971506026C0B857F689962856DED4010ABD0BE621\
C3A3960A54E710C375F26375D7014103A4B54330C198AF126116D2276E11715F693877FAD7EF09CADB094AE9\
1E1A1597";

/// Generator for the RFC 5114 2048-bit group.
const MODP_2048_G: &str = "3FB32C9B73134D0B2E77506660EDBD484CA7B18F21EF205407F4793A1A0BA125\
10DBC15077BE463FFF4FED4AAC0BB555BE3A6C1B0C6B47B1BC3773BF7E8C6F62901228F8C28CBB18A55AE313\
41000A650196F931C77A57F2DDF463E5E9EC144B777DE62AAAB8A8628AC376D282D6ED3864E67982428EBC83\
1D14348F6F2F9193B5045AF2767164E1DFC967C1FB3F2E55A4BD1BFFE83B9C80D052B985D182EA0ADB2A3B73\
13D3FE14C8484B1E052588B9B7D2BBD2DF016199ECD06E1557CD0915B3353BBB64E0EC377FD028370DF92B52\
C7891428CDC67EB6184B523D1DB246C32F63078490F00EF8D647D148D47954515E2327CFEF98C582664B4C0F\
6CC41659";

impl SchnorrGroup {
    /// Creates a group from explicit parameters.
    ///
    /// Rejects `p < 3` and any `g` outside `[2, p-1]`. Primality of `p` is
    /// the caller's responsibility; the shipped constructors use vetted
    /// constants.
    pub fn new(p: BigUint, g: BigUint) -> Result<Self> {
        if p < BigUint::from(3u32) {
            return Err(Error::Validation("group modulus too small".into()));
        }
        if g < BigUint::from(2u32) || g >= p {
            return Err(Error::Validation("generator out of range".into()));
        }
        Ok(Self { p, g })
    }

    /// The toy demonstration group `p = 1117, g = 5`.
    ///
    /// Soundness against a blind guess is only `1/(p-1)` per attempt, so this
    /// group is for tests and demos, never production.
    pub fn demo() -> Self {
        Self {
            p: BigUint::from(1117u32),
            g: BigUint::from(5u32),
        }
    }

    /// The RFC 5114 2048-bit MODP group.
    pub fn modp_2048() -> Self {
        let p = BigUint::parse_bytes(MODP_2048_P.as_bytes(), 16)
            .unwrap_or_else(|| unreachable!("RFC 5114 modulus constant is valid hex"));
        let g = BigUint::parse_bytes(MODP_2048_G.as_bytes(), 16)
            .unwrap_or_else(|| unreachable!("RFC 5114 generator constant is valid hex"));
        Self { p, g }
    }

    /// Returns the modulus `p`.
    pub fn modulus(&self) -> &BigUint {
        &self.p
    }

    /// Returns the generator `g`.
    pub fn generator(&self) -> &BigUint {
        &self.g
    }

    /// Derives the public value `v = g^x mod p` from a secret exponent.
    pub fn public_from_secret(&self, x: &BigUint) -> BigUint {
        mod_pow(&self.g, x, &self.p)
    }

    /// Draws a random exponent in `[1, p-2]`, the range used for both the
    /// prover's `r` and the verifier's challenge `c`.
    pub fn random_exponent<R: CryptoRngCore>(&self, rng: &mut R) -> BigUint {
        let min = BigUint::one();
        let max = &self.p - 2u32;
        random_in_range(rng, &min, &max)
    }

    /// Prover commitment: picks a fresh `r` and returns `(r, y1 = g^r mod p)`.
    ///
    /// `r` must be kept secret and used exactly once.
    pub fn commit<R: CryptoRngCore>(&self, rng: &mut R) -> (BigUint, BigUint) {
        let r = self.random_exponent(rng);
        let y1 = mod_pow(&self.g, &r, &self.p);
        (r, y1)
    }

    /// Prover response to the verifier's challenge: `y2 = r + c*x`.
    pub fn respond(r: &BigUint, c: &BigUint, x: &BigUint) -> BigUint {
        r + c * x
    }

    /// Checks the Schnorr identity `g^y2 = y1 * v^c (mod p)`.
    ///
    /// Equality holds iff `y2` was computed with the same `x` that derived
    /// `v`, up to an accidental-collision probability of `1/(p-1)` per
    /// attempt. Pure: no state, no side effects.
    pub fn verify(&self, v: &BigUint, y1: &BigUint, c: &BigUint, y2: &BigUint) -> bool {
        let left = mod_pow(&self.g, y2, &self.p);
        let right = (y1 * mod_pow(v, c, &self.p)) % &self.p;
        left == right
    }

    /// Validates an element received off the wire: must lie in `[1, p-1]`.
    pub fn validate_element(&self, e: &BigUint) -> Result<()> {
        if e.bits() == 0 || *e >= self.p {
            return Err(Error::Validation(
                "group element out of range".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SecureRng;

    #[test]
    fn honest_proof_verifies() {
        let group = SchnorrGroup::demo();
        let mut rng = SecureRng::new();

        let x = group.random_exponent(&mut rng);
        let v = group.public_from_secret(&x);

        let (r, y1) = group.commit(&mut rng);
        let c = group.random_exponent(&mut rng);
        let y2 = SchnorrGroup::respond(&r, &c, &x);

        assert!(group.verify(&v, &y1, &c, &y2));
    }

    #[test]
    fn wrong_secret_fails() {
        let group = SchnorrGroup::demo();
        let mut rng = SecureRng::new();

        let x = BigUint::from(17u32);
        let v = group.public_from_secret(&x);

        let (r, y1) = group.commit(&mut rng);
        // c small and nonzero: g^c != 1 mod p, so the forged response misses
        // deterministically rather than with probability 1/(p-1).
        let c = BigUint::from(9u32);
        let forged = SchnorrGroup::respond(&r, &c, &BigUint::from(18u32));

        assert!(!group.verify(&v, &y1, &c, &forged));
    }

    #[test]
    fn concrete_toy_scenario() {
        // p = 1117, g = 5, x = 17, r = 42, c = 9 => y2 = 42 + 9*17 = 195.
        let group = SchnorrGroup::demo();
        let x = BigUint::from(17u32);
        let v = group.public_from_secret(&x);
        let y1 = mod_pow(group.generator(), &BigUint::from(42u32), group.modulus());
        let c = BigUint::from(9u32);
        let y2 = SchnorrGroup::respond(&BigUint::from(42u32), &c, &x);

        assert_eq!(y2, BigUint::from(195u32));
        assert!(group.verify(&v, &y1, &c, &y2));
    }

    #[test]
    fn rejects_degenerate_parameters() {
        assert!(SchnorrGroup::new(BigUint::from(2u32), BigUint::from(1u32)).is_err());
        assert!(SchnorrGroup::new(BigUint::from(23u32), BigUint::from(1u32)).is_err());
        assert!(SchnorrGroup::new(BigUint::from(23u32), BigUint::from(23u32)).is_err());
    }

    #[test]
    fn element_validation() {
        let group = SchnorrGroup::demo();
        assert!(group.validate_element(&BigUint::from(1u32)).is_ok());
        assert!(group.validate_element(&BigUint::from(1116u32)).is_ok());
        assert!(group.validate_element(&BigUint::from(0u32)).is_err());
        assert!(group.validate_element(&BigUint::from(1117u32)).is_err());
    }

    #[test]
    fn modp_2048_constants_parse() {
        let group = SchnorrGroup::modp_2048();
        assert_eq!(group.modulus().bits(), 2048);
        assert!(group.generator() < group.modulus());
    }
}
