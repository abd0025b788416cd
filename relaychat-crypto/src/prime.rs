//! Random prime generation and the Miller–Rabin primality test.

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::{fill_random, random_below};

/// Default number of Miller–Rabin rounds. False positives occur with
/// probability at most `4^-rounds`.
pub const DEFAULT_ROUNDS: usize = 5;

/// Primes below 550, used for trial division ahead of Miller–Rabin.
const SMALL_PRIMES: [u32; 100] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191,
    193, 197, 199, 211, 223, 227, 229, 233, 239, 241, 251, 257, 263, 269, 271, 277, 281, 283, 293,
    307, 311, 313, 317, 331, 337, 347, 349, 353, 359, 367, 373, 379, 383, 389, 397, 401, 409, 419,
    421, 431, 433, 439, 443, 449, 457, 461, 463, 467, 479, 487, 491, 499, 503, 509, 521, 523, 541,
];

/// Probabilistic primality test with [`DEFAULT_ROUNDS`] Miller–Rabin rounds.
pub fn is_prime(n: &BigUint) -> bool {
    is_prime_with_rounds(n, DEFAULT_ROUNDS)
}

/// Probabilistic primality test with a caller-chosen number of rounds.
///
/// Never rejects a prime. A composite survives with probability at most
/// `4^-rounds`; composites sharing a factor with a prime below 550 are always
/// rejected.
pub fn is_prime_with_rounds(n: &BigUint, rounds: usize) -> bool {
    let two = BigUint::from(2u32);
    if n <= &BigUint::one() {
        return false;
    }
    if n <= &BigUint::from(3u32) {
        return true;
    }
    if !n.bit(0) {
        return false;
    }

    for &p in SMALL_PRIMES.iter() {
        let p = BigUint::from(p);
        if n == &p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }

    // n - 1 = d * 2^r with d odd
    let n_minus_one = n - 1u32;
    let r = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> r;

    // witnesses are drawn from [2, n - 2]
    let witness_span = n - 3u32;

    'witness: for _ in 0..rounds {
        let a = random_below(&witness_span) + &two;
        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_minus_one {
            continue;
        }
        for _ in 1..r {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Draw random odd integers of exactly `bits` bits (top bit set) until one
/// passes [`is_prime`].
///
/// # Panics
///
/// Panics if `bits < 2`.
pub fn generate_prime(bits: usize) -> BigUint {
    assert!(bits >= 2, "a prime needs at least 2 bits");
    let mut buf = vec![0u8; bits.div_ceil(8)];
    let excess = buf.len() * 8 - bits;
    let top = BigUint::one() << (bits - 1);
    loop {
        fill_random(&mut buf);
        buf[0] &= 0xff >> excess;
        let mut candidate = BigUint::from_bytes_be(&buf);
        candidate |= &top;
        candidate |= BigUint::one();
        if is_prime(&candidate) {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sieve(limit: usize) -> Vec<bool> {
        let mut flags = vec![true; limit];
        flags[0] = false;
        flags[1] = false;
        let mut i = 2;
        while i * i < limit {
            if flags[i] {
                let mut j = i * i;
                while j < limit {
                    flags[j] = false;
                    j += i;
                }
            }
            i += 1;
        }
        flags
    }

    #[test]
    fn classifies_every_integer_below_ten_thousand() {
        let expected = sieve(10_000);
        for (n, &prime) in expected.iter().enumerate() {
            assert_eq!(is_prime(&BigUint::from(n)), prime, "misclassified {n}");
        }
    }

    #[test]
    fn known_large_primes() {
        // 2^127 - 1 (Mersenne) and 2^89 - 1
        let m127 = (BigUint::one() << 127u32) - 1u32;
        let m89 = (BigUint::one() << 89u32) - 1u32;
        assert!(is_prime(&m127));
        assert!(is_prime(&m89));
        let p = BigUint::parse_bytes(b"170141183460469231731687303715884105727", 10).unwrap();
        assert_eq!(p, m127);
    }

    #[test]
    fn known_large_composites() {
        // 2^128 + 1 = 59649589127497217 * 5704689200685129054721
        let f7 = (BigUint::one() << 128u32) + 1u32;
        assert!(!is_prime(&f7));
        // product of two 64-bit-ish primes
        let p = BigUint::from(18446744073709551557u64);
        let q = BigUint::from(18446744073709551533u64);
        assert!(!is_prime(&(&p * &q)));
        // Carmichael numbers fool Fermat but not Miller–Rabin
        for c in [561u32, 41041, 825265, 321197185] {
            assert!(!is_prime(&BigUint::from(c)), "{c} is a Carmichael number");
        }
    }

    #[test]
    fn generated_primes_have_exact_bit_length() {
        for bits in [2usize, 3, 8, 13, 64, 128] {
            let p = generate_prime(bits);
            assert_eq!(p.bits() as usize, bits);
            assert!(is_prime(&p));
        }
    }
}
