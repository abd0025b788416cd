//! RSA-OAEP wrapping of short payloads.
//!
//! Only used for the 16-byte room key; chat traffic goes through
//! [`crate::session_cipher`].

use std::fmt;

use num_bigint::BigUint;

use crate::keys::{PrivateKey, PublicKey};
use crate::oaep::{self, OaepError};
use crate::to_fixed_be;

/// Errors from [`encrypt`] / [`decrypt`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// OAEP rejected the payload or the recovered block.
    Oaep(OaepError),
    /// The ciphertext integer is not below the modulus.
    CiphertextOutOfRange,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oaep(e)              => write!(f, "OAEP: {e}"),
            Self::CiphertextOutOfRange => write!(f, "ciphertext is not below the modulus"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Oaep(e) => Some(e),
            Self::CiphertextOutOfRange => None,
        }
    }
}

impl From<OaepError> for Error {
    fn from(e: OaepError) -> Self { Self::Oaep(e) }
}

/// OAEP-encode `message` to `k` bytes and raise it to `e` mod `n`.
pub fn encrypt(message: &[u8], key: &PublicKey, label: &[u8]) -> Result<BigUint, Error> {
    let block = oaep::encode(message, key.modulus_len(), label)?;
    Ok(key.apply(&BigUint::from_bytes_be(&block)))
}

/// Raise `ciphertext` to `d` mod `n` and OAEP-decode the `k`-byte block.
pub fn decrypt(ciphertext: &BigUint, key: &PrivateKey, label: &[u8]) -> Result<Vec<u8>, Error> {
    if ciphertext >= key.n() {
        return Err(Error::CiphertextOutOfRange);
    }
    let k = key.modulus_len();
    let m = key.apply(ciphertext);
    // m < n always fits in k bytes
    let block = to_fixed_be(&m, k).ok_or(Error::CiphertextOutOfRange)?;
    Ok(oaep::decode(&block, k, label)?)
}
