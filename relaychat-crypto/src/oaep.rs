//! OAEP encoding (SHA-256, MGF1-SHA-256).
//!
//! ```text
//! EM = 0x00 || maskedSeed (hLen) || maskedDB (k - hLen - 1)
//! DB = lHash || PS (zeros) || 0x01 || M
//! ```

use std::fmt;

use crate::digest::{HASH_LEN, mgf1, xor_in_place};
use crate::{fill_random, sha256};

/// Errors from [`encode`] / [`decode`]. Each one is final for that attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OaepError {
    /// The message exceeds `k - 2·hLen - 2` bytes.
    MessageTooLong { len: usize, max: usize },
    /// The encoded block is not exactly `k` bytes.
    LengthMismatch { len: usize, expected: usize },
    /// `k < 2·hLen + 2`.
    BlockTooSmall { k: usize },
    /// The recovered label hash differs from `hash(label)`.
    LabelMismatch,
    /// The first non-zero byte after the label hash is not `0x01`.
    InvalidPadding,
    /// `DB` ends before any `0x01` separator.
    SeparatorNotFound,
    /// The leading byte of the block is not `0x00`.
    InvalidFormat,
}

impl fmt::Display for OaepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessageTooLong { len, max }
                => write!(f, "message of {len} bytes exceeds OAEP capacity of {max}"),
            Self::LengthMismatch { len, expected }
                => write!(f, "encoded block is {len} bytes, expected {expected}"),
            Self::BlockTooSmall { k }
                => write!(f, "block of {k} bytes is below the OAEP minimum of {}", 2 * HASH_LEN + 2),
            Self::LabelMismatch     => write!(f, "label hash mismatch"),
            Self::InvalidPadding    => write!(f, "invalid OAEP padding"),
            Self::SeparatorNotFound => write!(f, "OAEP separator not found"),
            Self::InvalidFormat     => write!(f, "leading byte of OAEP block is not zero"),
        }
    }
}

impl std::error::Error for OaepError {}

/// Largest message that fits a `k`-byte block.
pub fn max_message_len(k: usize) -> usize {
    k.saturating_sub(2 * HASH_LEN + 2)
}

/// OAEP-encode `message` into exactly `k` bytes under a fresh random seed.
pub fn encode(message: &[u8], k: usize, label: &[u8]) -> Result<Vec<u8>, OaepError> {
    let mut seed = [0u8; HASH_LEN];
    fill_random(&mut seed);
    encode_with_seed(message, k, label, &seed)
}

pub(crate) fn encode_with_seed(
    message: &[u8],
    k:       usize,
    label:   &[u8],
    seed:    &[u8; HASH_LEN],
) -> Result<Vec<u8>, OaepError> {
    let max = k
        .checked_sub(2 * HASH_LEN + 2)
        .ok_or(OaepError::MessageTooLong { len: message.len(), max: 0 })?;
    if message.len() > max {
        return Err(OaepError::MessageTooLong { len: message.len(), max });
    }

    let db_len = k - HASH_LEN - 1;
    let mut db = Vec::with_capacity(db_len);
    db.extend_from_slice(&sha256!(label));
    db.resize(db_len - message.len() - 1, 0);
    db.push(0x01);
    db.extend_from_slice(message);

    xor_in_place(&mut db, &mgf1(seed, db_len));
    let mut masked_seed = *seed;
    xor_in_place(&mut masked_seed, &mgf1(&db, HASH_LEN));

    let mut block = Vec::with_capacity(k);
    block.push(0x00);
    block.extend_from_slice(&masked_seed);
    block.extend_from_slice(&db);
    Ok(block)
}

/// Invert [`encode`], returning the original message.
pub fn decode(encoded: &[u8], k: usize, label: &[u8]) -> Result<Vec<u8>, OaepError> {
    if encoded.len() != k {
        return Err(OaepError::LengthMismatch { len: encoded.len(), expected: k });
    }
    if k < 2 * HASH_LEN + 2 {
        return Err(OaepError::BlockTooSmall { k });
    }

    let leading = encoded[0];
    let mut seed = encoded[1..1 + HASH_LEN].to_vec();
    let masked_db = &encoded[1 + HASH_LEN..];

    xor_in_place(&mut seed, &mgf1(masked_db, HASH_LEN));
    let db_len = masked_db.len();
    let mut db = masked_db.to_vec();
    xor_in_place(&mut db, &mgf1(&seed, db_len));

    if db[..HASH_LEN] != sha256!(label) {
        return Err(OaepError::LabelMismatch);
    }
    if leading != 0x00 {
        return Err(OaepError::InvalidFormat);
    }

    let rest = &db[HASH_LEN..];
    match rest.iter().position(|&b| b != 0) {
        Some(i) if rest[i] == 0x01 => Ok(rest[i + 1..].to_vec()),
        Some(_) => Err(OaepError::InvalidPadding),
        None => Err(OaepError::SeparatorNotFound),
    }
}
