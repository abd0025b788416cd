//! RSA key-pair construction.

use std::fmt;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

use crate::prime::{generate_prime, is_prime};
use crate::random_below;

/// Preferred public exponent.
pub const DEFAULT_EXPONENT: u32 = 65_537;

/// Smallest modulus size accepted by [`generate_keys`].
pub const MIN_KEY_BITS: usize = 16;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Errors from key-pair construction.
#[derive(Clone, Debug, PartialEq)]
pub enum KeyGenError {
    /// The requested modulus is too small to hold two distinct primes.
    KeySizeTooSmall { bits: usize },
    /// A supplied factor failed the primality test.
    NotPrime { value: BigUint },
    /// Both supplied factors are the same prime.
    EqualPrimes,
    /// `e` has no inverse modulo `φ(n)`. Unreachable after the coprimality check.
    NoModularInverse,
}

impl fmt::Display for KeyGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeySizeTooSmall { bits } => {
                write!(f, "{bits}-bit modulus is too small (minimum {MIN_KEY_BITS})")
            }
            Self::NotPrime { value } => write!(f, "{value} is not prime"),
            Self::EqualPrimes => write!(f, "p and q must be distinct"),
            Self::NoModularInverse => write!(f, "public exponent has no inverse modulo phi(n)"),
        }
    }
}

impl std::error::Error for KeyGenError {}

// ─── Keys ────────────────────────────────────────────────────────────────────

/// An RSA public key `(e, n)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    e: BigUint,
    n: BigUint,
}

impl PublicKey {
    pub fn new(e: BigUint, n: BigUint) -> Self {
        Self { e, n }
    }

    pub fn e(&self) -> &BigUint { &self.e }
    pub fn n(&self) -> &BigUint { &self.n }

    /// Modulus length in bytes, `ceil(bitlen(n) / 8)`.
    pub fn modulus_len(&self) -> usize { modulus_len(&self.n) }

    /// Textbook RSA: `m^e mod n`.
    pub fn apply(&self, m: &BigUint) -> BigUint {
        m.modpow(&self.e, &self.n)
    }
}

/// An RSA private key `(d, n)`.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    d: BigUint,
    n: BigUint,
}

impl PrivateKey {
    pub fn new(d: BigUint, n: BigUint) -> Self {
        Self { d, n }
    }

    pub fn d(&self) -> &BigUint { &self.d }
    pub fn n(&self) -> &BigUint { &self.n }

    /// Modulus length in bytes, `ceil(bitlen(n) / 8)`.
    pub fn modulus_len(&self) -> usize { modulus_len(&self.n) }

    /// Textbook RSA: `c^d mod n`.
    pub fn apply(&self, c: &BigUint) -> BigUint {
        c.modpow(&self.d, &self.n)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({} bits)", self.n.bits())
    }
}

/// A matching public/private key pair. Held for one connection, never persisted.
#[derive(Clone, Debug)]
pub struct KeyPair {
    pub public:  PublicKey,
    pub private: PrivateKey,
}

impl KeyPair {
    /// Build a key pair from two caller-supplied primes.
    pub fn from_primes(p: BigUint, q: BigUint) -> Result<Self, KeyGenError> {
        for value in [&p, &q] {
            if !is_prime(value) {
                return Err(KeyGenError::NotPrime { value: value.clone() });
            }
        }
        if p == q {
            return Err(KeyGenError::EqualPrimes);
        }
        derive(&p, &q)
    }
}

fn modulus_len(n: &BigUint) -> usize {
    (n.bits() as usize).div_ceil(8)
}

/// Generate a fresh RSA key pair whose modulus has `bits` bits (±1).
pub fn generate_keys(bits: usize) -> Result<KeyPair, KeyGenError> {
    if bits < MIN_KEY_BITS {
        return Err(KeyGenError::KeySizeTooSmall { bits });
    }
    let p_bits = bits / 2;
    let q_bits = bits - p_bits;
    let p = generate_prime(p_bits);
    let q = loop {
        let q = generate_prime(q_bits);
        if q != p {
            break q;
        }
    };
    derive(&p, &q)
}

fn derive(p: &BigUint, q: &BigUint) -> Result<KeyPair, KeyGenError> {
    let n = p * q;
    let phi = (p - 1u32) * (q - 1u32);

    let mut e = BigUint::from(DEFAULT_EXPONENT);
    if !e.gcd(&phi).is_one() {
        // resample from [2, φ - 1]
        let span = &phi - 2u32;
        e = loop {
            let candidate = random_below(&span) + 2u32;
            if candidate.gcd(&phi).is_one() {
                break candidate;
            }
        };
    }

    let d = mod_inverse(&e, &phi).ok_or(KeyGenError::NoModularInverse)?;
    Ok(KeyPair {
        public:  PublicKey::new(e, n.clone()),
        private: PrivateKey::new(d, n),
    })
}

/// Extended Euclidean algorithm: `(g, x, y)` with `a·x + b·y = g = gcd(a, b)`.
pub fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
    let (mut old_t, mut t) = (BigInt::zero(), BigInt::one());
    while !r.is_zero() {
        let quotient = &old_r / &r;
        let next_r = &old_r - &quotient * &r;
        old_r = std::mem::replace(&mut r, next_r);
        let next_s = &old_s - &quotient * &s;
        old_s = std::mem::replace(&mut s, next_s);
        let next_t = &old_t - &quotient * &t;
        old_t = std::mem::replace(&mut t, next_t);
    }
    (old_r, old_s, old_t)
}

/// Inverse of `a` modulo `m`, or `None` when `gcd(a, m) != 1`.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    let m_int = BigInt::from(m.clone());
    let (g, x, _) = extended_gcd(&BigInt::from(a.clone()), &m_int);
    if !g.abs().is_one() {
        return None;
    }
    x.mod_floor(&m_int).to_biguint()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(v: u64) -> BigUint { BigUint::from(v) }

    fn check_pair(pair: &KeyPair, phi: &BigUint) {
        let ed = pair.public.e() * pair.private.d();
        assert!((ed % phi).is_one(), "e·d must be 1 mod φ(n)");
        assert!(pair.public.e().gcd(phi).is_one());
        assert_eq!(pair.public.n(), pair.private.n());
    }

    #[test]
    fn textbook_61_53_key() {
        let phi = big(3120);
        assert_eq!(mod_inverse(&big(17), &phi), Some(big(2753)));

        let public = PublicKey::new(big(17), big(3233));
        let private = PrivateKey::new(big(2753), big(3233));
        assert_eq!(public.apply(&big(65)), big(2790));
        assert_eq!(private.apply(&big(2790)), big(65));
    }

    #[test]
    fn from_primes_uses_default_exponent_when_coprime() {
        let pair = KeyPair::from_primes(big(61), big(53)).unwrap();
        assert_eq!(pair.public.n(), &big(3233));
        assert_eq!(pair.public.e(), &big(65537));
        check_pair(&pair, &big(3120));
    }

    #[test]
    fn from_primes_falls_back_when_65537_divides_phi() {
        // 917519 - 1 = 14·65537, so 65537 divides φ(n)
        let p = big(917_519);
        assert!(is_prime(&p));
        let q = big(1_000_003);
        let pair = KeyPair::from_primes(p.clone(), q.clone()).unwrap();
        let phi = (&p - 1u32) * (&q - 1u32);
        assert_ne!(pair.public.e(), &big(65537));
        check_pair(&pair, &phi);
    }

    #[test]
    fn from_primes_rejects_bad_input() {
        assert_eq!(
            KeyPair::from_primes(big(61), big(51)).unwrap_err(),
            KeyGenError::NotPrime { value: big(51) }
        );
        assert_eq!(KeyPair::from_primes(big(61), big(61)).unwrap_err(), KeyGenError::EqualPrimes);
    }

    #[test]
    fn mod_inverse_missing_when_not_coprime() {
        assert_eq!(mod_inverse(&big(6), &big(9)), None);
        assert_eq!(mod_inverse(&big(3), &big(7)), Some(big(5)));
    }

    #[test]
    fn extended_gcd_bezout_identity() {
        let a = BigInt::from(240);
        let b = BigInt::from(46);
        let (g, x, y) = extended_gcd(&a, &b);
        assert_eq!(g, BigInt::from(2));
        assert_eq!(&a * &x + &b * &y, g);
    }

    #[test]
    fn derived_exponents_are_inverse_mod_phi() {
        for bits in [8usize, 16, 32, 64, 128, 256] {
            let p = generate_prime(bits);
            let q = loop {
                let q = generate_prime(bits);
                if q != p { break q; }
            };
            let phi = (&p - 1u32) * (&q - 1u32);
            let pair = derive(&p, &q).unwrap();
            assert_eq!(pair.public.n(), &(&p * &q));
            check_pair(&pair, &phi);
        }
    }

    #[test]
    fn generated_keys_are_consistent() {
        for bits in [16usize, 17, 32, 64, 128, 256, 512] {
            let pair = generate_keys(bits).unwrap();
            let n_bits = pair.public.n().bits() as usize;
            assert!(n_bits + 1 >= bits && n_bits <= bits + 1, "{bits} → {n_bits}");
            let m = big(42) % pair.public.n();
            assert_eq!(pair.private.apply(&pair.public.apply(&m)), m);
        }
    }

    #[test]
    fn rejects_tiny_modulus() {
        assert_eq!(generate_keys(8).unwrap_err(), KeyGenError::KeySizeTooSmall { bits: 8 });
    }
}
