//! The 16-byte room key shared by every member.

use crate::fill_random;

/// Length of the room key in bytes.
pub const SESSION_KEY_LEN: usize = 16;

/// Symmetric room key. One per relay process; every member holds a copy.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey {
    data: [u8; SESSION_KEY_LEN],
}

impl SessionKey {
    /// Draw a new key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut data = [0u8; SESSION_KEY_LEN];
        fill_random(&mut data);
        Self { data }
    }

    pub fn from_bytes(data: [u8; SESSION_KEY_LEN]) -> Self {
        Self { data }
    }

    /// Accepts exactly [`SESSION_KEY_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        Some(Self { data: bytes.try_into().ok()? })
    }

    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] { &self.data }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}
