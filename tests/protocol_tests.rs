//! Protocol arithmetic tests: completeness, soundness against forgeries, and
//! the documented concrete vectors.

use num_bigint::BigUint;
use zkauth::crypto::{mod_pow, random_in_range};
use zkauth::{SchnorrGroup, SecureRng};

#[test]
fn documented_toy_vectors() {
    // p = 1117, g = 5, x = 17: v = 5^17 mod 1117.
    let group = SchnorrGroup::demo();
    let x = BigUint::from(17u32);
    let v = group.public_from_secret(&x);
    assert_eq!(v, mod_pow(&BigUint::from(5u32), &x, &BigUint::from(1117u32)));

    // r = 42, c = 9: y2 = 42 + 9*17 = 195 and the identity holds.
    let r = BigUint::from(42u32);
    let y1 = mod_pow(group.generator(), &r, group.modulus());
    let c = BigUint::from(9u32);
    let y2 = SchnorrGroup::respond(&r, &c, &x);

    assert_eq!(y2, BigUint::from(195u32));
    assert!(group.verify(&v, &y1, &c, &y2));
}

#[test]
fn completeness_over_random_draws() {
    let group = SchnorrGroup::demo();
    let mut rng = SecureRng::new();

    for _ in 0..200 {
        let x = group.random_exponent(&mut rng);
        let v = group.public_from_secret(&x);
        let (r, y1) = group.commit(&mut rng);
        let c = group.random_exponent(&mut rng);
        let y2 = SchnorrGroup::respond(&r, &c, &x);

        assert!(group.verify(&v, &y1, &c, &y2));
    }
}

#[test]
fn response_is_unreduced() {
    // y2 = r + c*x over the integers can exceed p; verification must not care.
    let group = SchnorrGroup::demo();
    let x = BigUint::from(1000u32);
    let v = group.public_from_secret(&x);
    let r = BigUint::from(1100u32);
    let y1 = mod_pow(group.generator(), &r, group.modulus());
    let c = BigUint::from(1115u32);
    let y2 = SchnorrGroup::respond(&r, &c, &x);

    assert!(y2 > *group.modulus());
    assert!(group.verify(&v, &y1, &c, &y2));
}

#[test]
fn forged_response_fails() {
    let group = SchnorrGroup::demo();
    let mut rng = SecureRng::new();

    let x = BigUint::from(17u32);
    let v = group.public_from_secret(&x);

    // A nonzero challenge makes a wrong-secret response miss
    // deterministically; a blind guess still wins with chance 1/(p-1).
    let (r, y1) = group.commit(&mut rng);
    let c = BigUint::from(9u32);

    for wrong_x in [16u32, 18, 34, 1000] {
        let forged = SchnorrGroup::respond(&r, &c, &BigUint::from(wrong_x));
        assert!(!group.verify(&v, &y1, &c, &forged));
    }
}

#[test]
fn tampered_commitment_fails() {
    let group = SchnorrGroup::demo();
    let mut rng = SecureRng::new();

    let x = group.random_exponent(&mut rng);
    let v = group.public_from_secret(&x);
    let (r, y1) = group.commit(&mut rng);
    let c = group.random_exponent(&mut rng);
    let y2 = SchnorrGroup::respond(&r, &c, &x);

    let tampered = (&y1 + 1u32) % group.modulus();
    if tampered != y1 && tampered.bits() != 0 {
        assert!(!group.verify(&v, &tampered, &c, &y2));
    }
}

#[test]
fn mod_pow_conventions() {
    // modulus 1: everything congruent to 0.
    assert_eq!(
        mod_pow(&BigUint::from(7u32), &BigUint::from(3u32), &BigUint::from(1u32)),
        BigUint::from(0u32)
    );
    // zero exponent: 1.
    assert_eq!(
        mod_pow(&BigUint::from(7u32), &BigUint::from(0u32), &BigUint::from(13u32)),
        BigUint::from(1u32)
    );
}

#[test]
fn random_exponent_stays_in_range() {
    let group = SchnorrGroup::demo();
    let mut rng = SecureRng::new();
    let upper = group.modulus() - 2u32;

    for _ in 0..1000 {
        let e = group.random_exponent(&mut rng);
        assert!(e >= BigUint::from(1u32));
        assert!(e <= upper);
    }
}

#[test]
fn random_in_range_is_inclusive() {
    let mut rng = SecureRng::new();
    let min = BigUint::from(5u32);
    let max = BigUint::from(6u32);

    let mut seen_min = false;
    let mut seen_max = false;
    for _ in 0..500 {
        let v = random_in_range(&mut rng, &min, &max);
        assert!(v >= min && v <= max);
        seen_min |= v == min;
        seen_max |= v == max;
    }
    assert!(seen_min && seen_max, "both endpoints should be reachable");
}
