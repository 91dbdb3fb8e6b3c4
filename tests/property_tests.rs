//! Property-based tests for the protocol arithmetic and token format.

use num_bigint::BigUint;
use proptest::prelude::*;
use zkauth::crypto::{mod_pow, random_in_range};
use zkauth::{SchnorrGroup, SecureRng, SessionKeeper};

proptest! {
    #[test]
    fn honest_proofs_always_verify(x in 1u32..=1115, r in 1u32..=1115, c in 1u32..=1115) {
        let group = SchnorrGroup::demo();
        let x = BigUint::from(x);
        let r = BigUint::from(r);
        let c = BigUint::from(c);

        let v = group.public_from_secret(&x);
        let y1 = mod_pow(group.generator(), &r, group.modulus());
        let y2 = SchnorrGroup::respond(&r, &c, &x);

        prop_assert!(group.verify(&v, &y1, &c, &y2));
    }

    #[test]
    fn forged_proof_verifies_iff_exponent_collides(
        x in 1u32..=1115,
        r in 1u32..=1115,
        c in 1u32..=1115,
        delta in 1u32..=1115,
    ) {
        // A response computed with x + delta passes exactly when
        // g^(c*delta) = 1 mod p, so verification reduces to that identity.
        let group = SchnorrGroup::demo();
        let x = BigUint::from(x);
        let r = BigUint::from(r);
        let c = BigUint::from(c);
        let wrong_x = &x + BigUint::from(delta);

        let v = group.public_from_secret(&x);
        let y1 = mod_pow(group.generator(), &r, group.modulus());
        let forged = SchnorrGroup::respond(&r, &c, &wrong_x);

        let collision = mod_pow(
            group.generator(),
            &(&c * BigUint::from(delta)),
            group.modulus(),
        ) == BigUint::from(1u32);

        prop_assert_eq!(group.verify(&v, &y1, &c, &forged), collision);
    }

    #[test]
    fn mod_pow_matches_naive(base in 0u64..1000, exponent in 0u32..64, modulus in 2u64..1000) {
        let expected = {
            let mut acc = BigUint::from(1u32);
            let b = BigUint::from(base) % modulus;
            for _ in 0..exponent {
                acc = (acc * &b) % modulus;
            }
            acc
        };
        prop_assert_eq!(
            mod_pow(&BigUint::from(base), &BigUint::from(exponent), &BigUint::from(modulus)),
            expected
        );
    }

    #[test]
    fn random_in_range_respects_bounds(min in 0u64..10_000, width in 0u64..10_000) {
        let mut rng = SecureRng::new();
        let min = BigUint::from(min);
        let max = &min + BigUint::from(width);

        let v = random_in_range(&mut rng, &min, &max);
        prop_assert!(v >= min);
        prop_assert!(v <= max);
    }

    #[test]
    fn tokens_round_trip_for_any_identifier(identifier in "[A-Za-z0-9._-]{1,64}") {
        let keeper = SessionKeeper::new("0123456789abcdef0123456789abcdef", 900).unwrap();
        let minted = keeper.mint(&identifier);
        prop_assert_eq!(keeper.validate(&minted.token).unwrap(), identifier);
    }

    #[test]
    fn truncated_tokens_never_validate(identifier in "[a-z]{1,16}", cut in 1usize..20) {
        let keeper = SessionKeeper::new("0123456789abcdef0123456789abcdef", 900).unwrap();
        let minted = keeper.mint(&identifier);
        let truncated = &minted.token[..minted.token.len() - cut];
        prop_assert!(keeper.validate(truncated).is_err());
    }
}
