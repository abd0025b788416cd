//! AES-128-CBC with PKCS#7 padding for chat payloads.
//!
//! Every call to [`encrypt`] draws its own IV; callers cannot supply one.
//! Output layout: `IV (16) || ciphertext`.

use std::fmt;

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};

use crate::fill_random;
use crate::session_key::SessionKey;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// AES block size, also the IV length.
pub const BLOCK_LEN: usize = 16;

/// Errors from [`decrypt`]. Fatal for the frame, not the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionCipherError {
    /// Shorter than one IV plus one block, or not block-aligned.
    Truncated { len: usize },
    /// PKCS#7 padding bytes are malformed (wrong key or corrupted frame).
    PaddingError,
}

impl fmt::Display for SessionCipherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { len } => write!(f, "framed ciphertext of {len} bytes is malformed"),
            Self::PaddingError      => write!(f, "invalid PKCS#7 padding"),
        }
    }
}

impl std::error::Error for SessionCipherError {}

/// Encrypt `plaintext` under `key` with a fresh random IV.
pub fn encrypt(plaintext: &[u8], key: &SessionKey) -> Vec<u8> {
    let mut iv = [0u8; BLOCK_LEN];
    fill_random(&mut iv);
    let ciphertext = Aes128CbcEnc::new(key.as_bytes().into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut framed = Vec::with_capacity(BLOCK_LEN + ciphertext.len());
    framed.extend_from_slice(&iv);
    framed.extend_from_slice(&ciphertext);
    framed
}

/// Split off the IV, decrypt the rest under `key` and strip the padding.
pub fn decrypt(framed: &[u8], key: &SessionKey) -> Result<Vec<u8>, SessionCipherError> {
    if framed.len() < 2 * BLOCK_LEN || framed.len() % BLOCK_LEN != 0 {
        return Err(SessionCipherError::Truncated { len: framed.len() });
    }
    let (iv, ciphertext) = framed.split_at(BLOCK_LEN);
    let iv: [u8; BLOCK_LEN] = iv
        .try_into()
        .map_err(|_| SessionCipherError::Truncated { len: framed.len() })?;
    Aes128CbcDec::new(key.as_bytes().into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| SessionCipherError::PaddingError)
}
