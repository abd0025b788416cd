//! SHA-256 helpers and the MGF1 mask generation function.

/// Digest length (`hLen`) of the hash used throughout OAEP.
pub const HASH_LEN: usize = 32;

/// Calculate the SHA-256 hash of one or more byte slices concatenated.
#[macro_export]
macro_rules! sha256 {
    ( $( $x:expr ),+ ) => {{
        use sha2::{Digest, Sha256};
        let mut h = Sha256::new();
        $( h.update($x); )+
        let out: [u8; 32] = h.finalize().into();
        out
    }};
}

/// MGF1 over SHA-256.
///
/// Concatenates `SHA256(seed || counter_be32)` for `counter = 0, 1, …` and
/// truncates the result to exactly `len` bytes.
pub fn mgf1(seed: &[u8], len: usize) -> Vec<u8> {
    let mut mask = Vec::with_capacity(len.div_ceil(HASH_LEN) * HASH_LEN);
    let mut counter: u32 = 0;
    while mask.len() < len {
        mask.extend_from_slice(&sha256!(seed, counter.to_be_bytes()));
        counter = counter.wrapping_add(1);
    }
    mask.truncate(len);
    mask
}

/// XOR `mask` into `data` in place. Both slices must have equal length.
pub(crate) fn xor_in_place(data: &mut [u8], mask: &[u8]) {
    debug_assert_eq!(data.len(), mask.len());
    for (a, b) in data.iter_mut().zip(mask) {
        *a ^= b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mgf1_first_block_is_hash_of_seed_and_zero_counter() {
        let mask = mgf1(b"seed", HASH_LEN);
        assert_eq!(mask, sha256!(b"seed", [0u8, 0, 0, 0]).to_vec());
    }

    #[test]
    fn mgf1_is_prefix_stable_across_lengths() {
        let long = mgf1(b"abc", 100);
        assert_eq!(long.len(), 100);
        assert_eq!(&long[..33], &mgf1(b"abc", 33)[..]);
        assert_eq!(&long[32..64], &sha256!(b"abc", 1u32.to_be_bytes())[..]);
        assert!(mgf1(b"abc", 0).is_empty());
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256!(b""),
            [
                0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14, 0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f,
                0xb9, 0x24, 0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c, 0xa4, 0x95, 0x99, 0x1b,
                0x78, 0x52, 0xb8, 0x55,
            ]
        );
    }
}
