use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand_core::CryptoRngCore;

/// Performs modular exponentiation via square-and-multiply.
///
/// Computes `base^exponent mod modulus`, reducing `base` modulo `modulus`
/// first and walking the binary representation of `exponent`.
///
/// Returns 0 when `modulus == 1` (the value is congruent to 0 for every
/// input, and the convention keeps the function total).
pub fn mod_pow(base: &BigUint, exponent: &BigUint, modulus: &BigUint) -> BigUint {
    if modulus.is_one() {
        return BigUint::zero();
    }

    let mut result = BigUint::one();
    let mut base = base % modulus;
    let mut exponent = exponent.clone();

    while !exponent.is_zero() {
        if exponent.bit(0) {
            result = (&result * &base) % modulus;
        }
        base = (&base * &base) % modulus;
        exponent >>= 1;
    }

    result
}

/// Samples a uniformly distributed value in `[min, max]` inclusive.
///
/// Uses rejection sampling: draws `ceil(log2(max - min + 1))` bits from the
/// given CSPRNG until the value falls below the range size, then offsets by
/// `min`. The loop terminates with probability 1 and takes fewer than two
/// iterations in expectation.
///
/// # Panics
///
/// Panics if `min > max`.
pub fn random_in_range<R: CryptoRngCore>(rng: &mut R, min: &BigUint, max: &BigUint) -> BigUint {
    assert!(min <= max, "empty sampling range");

    let range = max - min + 1u32;
    let bits = range.bits();

    loop {
        let candidate = rng.gen_biguint(bits);
        if candidate < range {
            return min + candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SecureRng;

    #[test]
    fn mod_pow_matches_naive() {
        let base = BigUint::from(5u32);
        let modulus = BigUint::from(1117u32);

        let mut expected = BigUint::one();
        for exponent in 0u32..50 {
            assert_eq!(
                mod_pow(&base, &BigUint::from(exponent), &modulus),
                expected,
                "5^{exponent} mod 1117"
            );
            expected = (&expected * &base) % &modulus;
        }
    }

    #[test]
    fn mod_pow_zero_exponent_is_one() {
        let m = BigUint::from(97u32);
        assert_eq!(
            mod_pow(&BigUint::from(12345u32), &BigUint::zero(), &m),
            BigUint::one()
        );
    }

    #[test]
    fn mod_pow_modulus_one_is_zero() {
        assert_eq!(
            mod_pow(&BigUint::from(7u32), &BigUint::from(100u32), &BigUint::one()),
            BigUint::zero()
        );
    }

    #[test]
    fn mod_pow_reduces_base_first() {
        let m = BigUint::from(13u32);
        assert_eq!(
            mod_pow(&BigUint::from(40u32), &BigUint::from(3u32), &m),
            mod_pow(&BigUint::from(1u32), &BigUint::from(3u32), &m)
        );
    }

    #[test]
    fn random_in_range_stays_in_bounds() {
        let mut rng = SecureRng::new();
        let min = BigUint::from(10u32);
        let max = BigUint::from(20u32);

        for _ in 0..1000 {
            let v = random_in_range(&mut rng, &min, &max);
            assert!(v >= min && v <= max);
        }
    }

    #[test]
    fn random_in_range_is_not_constant() {
        let mut rng = SecureRng::new();
        let min = BigUint::zero();
        let max = BigUint::from(u64::MAX);

        let first = random_in_range(&mut rng, &min, &max);
        let varied = (0..100).any(|_| random_in_range(&mut rng, &min, &max) != first);
        assert!(varied, "sampler returned a constant over 100 draws");
    }

    #[test]
    fn random_in_range_degenerate_interval() {
        let mut rng = SecureRng::new();
        let v = BigUint::from(42u32);
        assert_eq!(random_in_range(&mut rng, &v, &v), v);
    }
}
