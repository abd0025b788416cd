//! Cryptographic core for relaychat.
//!
//! Provides:
//! - Miller–Rabin primality testing and random prime generation
//! - RSA key-pair construction (`e = 65537` with a random coprime fallback)
//! - OAEP encoding/decoding over SHA-256 with MGF1
//! - RSA-OAEP wrapping of short payloads (the room session key)
//! - AES-128-CBC with PKCS#7 padding and a fresh IV per message
//! - `SessionKey`, the 16-byte room key

#![deny(unsafe_code)]

mod digest;
pub mod keys;
pub mod oaep;
pub mod prime;
pub mod rsa;
pub mod session_cipher;
mod session_key;

pub use digest::{HASH_LEN, mgf1};
pub use keys::{KeyGenError, KeyPair, PrivateKey, PublicKey, generate_keys};
pub use oaep::OaepError;
pub use prime::{generate_prime, is_prime};
pub use session_cipher::SessionCipherError;
pub use session_key::{SESSION_KEY_LEN, SessionKey};

use num_bigint::BigUint;
use num_traits::Zero;

/// Fill `buf` from the operating system's CSPRNG.
pub(crate) fn fill_random(buf: &mut [u8]) {
    getrandom::getrandom(buf).expect("getrandom failed");
}

/// Uniformly random integer in `[0, bound)`. `bound` must be non-zero.
pub(crate) fn random_below(bound: &BigUint) -> BigUint {
    debug_assert!(!bound.is_zero());
    let bits = bound.bits() as usize;
    let mut buf = vec![0u8; bits.div_ceil(8)];
    let excess = buf.len() * 8 - bits;
    loop {
        fill_random(&mut buf);
        buf[0] &= 0xff >> excess;
        let candidate = BigUint::from_bytes_be(&buf);
        if &candidate < bound {
            return candidate;
        }
    }
}

/// Serialize `value` big-endian, left-padded with zeros to exactly `len` bytes.
///
/// Returns `None` if `value` does not fit.
pub(crate) fn to_fixed_be(value: &BigUint, len: usize) -> Option<Vec<u8>> {
    let raw = value.to_bytes_be();
    let raw = if value.is_zero() { &raw[..0] } else { &raw[..] };
    if raw.len() > len {
        return None;
    }
    let mut out = vec![0u8; len - raw.len()];
    out.extend_from_slice(raw);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_below_stays_in_range() {
        let bound = BigUint::from(37u32);
        for _ in 0..500 {
            assert!(random_below(&bound) < bound);
        }
    }

    #[test]
    fn fixed_be_pads_and_rejects_overflow() {
        let v = BigUint::from(0x0102u32);
        assert_eq!(to_fixed_be(&v, 4).unwrap(), vec![0, 0, 1, 2]);
        assert_eq!(to_fixed_be(&BigUint::zero(), 3).unwrap(), vec![0, 0, 0]);
        assert!(to_fixed_be(&v, 1).is_none());
    }
}
