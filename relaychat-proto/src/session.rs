//! Post-handshake payload protection.

use std::fmt;

use relaychat_crypto::{SessionCipherError, SessionKey, session_cipher};

use crate::chat::ChatMessage;
use crate::frame::Frame;

// ─── DecodeError ─────────────────────────────────────────────────────────────

/// A data frame could not be turned back into a chat message.
///
/// Fatal for that frame only; the connection stays open.
#[derive(Debug)]
pub enum DecodeError {
    /// A text frame arrived where a data frame was expected.
    NotBinary,
    /// Framing or padding is broken.
    Cipher(SessionCipherError),
    /// Decrypted payload is not a chat message (also used when encoding fails).
    Payload(serde_json::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotBinary  => write!(f, "expected a binary data frame"),
            Self::Cipher(e)  => write!(f, "decrypt failed: {e}"),
            Self::Payload(e) => write!(f, "bad chat payload: {e}"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotBinary  => None,
            Self::Cipher(e)  => Some(e),
            Self::Payload(e) => Some(e),
        }
    }
}

impl From<SessionCipherError> for DecodeError {
    fn from(e: SessionCipherError) -> Self { Self::Cipher(e) }
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self { Self::Payload(e) }
}

// ─── SessionHandle ───────────────────────────────────────────────────────────

/// The installed room key and the operations that use it.
///
/// Cheap to clone; every clone encrypts under the same key.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    key: SessionKey,
}

impl SessionHandle {
    /// Handle for an installed room key.
    pub fn new(key: SessionKey) -> Self {
        Self { key }
    }

    /// The room key.
    pub fn key(&self) -> &SessionKey { &self.key }

    /// `IV || ciphertext` for `plaintext`, with a fresh IV.
    pub fn wrap(&self, plaintext: &[u8]) -> Vec<u8> {
        session_cipher::encrypt(plaintext, &self.key)
    }

    /// Inverse of [`wrap`](Self::wrap).
    pub fn unwrap(&self, framed: &[u8]) -> Result<Vec<u8>, DecodeError> {
        Ok(session_cipher::decrypt(framed, &self.key)?)
    }

    /// Encrypt a chat message into a binary frame.
    pub fn seal(&self, message: &ChatMessage) -> Result<Frame, DecodeError> {
        Ok(Frame::Binary(self.wrap(&message.to_json()?)))
    }

    /// Decrypt a binary frame into a chat message.
    pub fn open(&self, frame: &Frame) -> Result<ChatMessage, DecodeError> {
        let Frame::Binary(framed) = frame else {
            return Err(DecodeError::NotBinary);
        };
        Ok(ChatMessage::from_json(&self.unwrap(framed)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> SessionHandle { SessionHandle::new(SessionKey::generate()) }

    #[test]
    fn seal_open() {
        let h = handle();
        let m = ChatMessage::new("alice", "hi");
        let frame = h.seal(&m).unwrap();
        assert!(!frame.is_text());
        assert_eq!(h.open(&frame).unwrap(), m);
    }

    #[test]
    fn clones_share_the_key() {
        let a = handle();
        let b = a.clone();
        assert_eq!(b.unwrap(&a.wrap(b"payload")).unwrap(), b"payload");
    }

    #[test]
    fn text_frames_are_not_data() {
        assert!(matches!(handle().open(&Frame::Text("{}".into())), Err(DecodeError::NotBinary)));
    }

    #[test]
    fn non_chat_plaintext_is_a_payload_error() {
        let h = handle();
        let frame = Frame::Binary(h.wrap(b"not json"));
        assert!(matches!(h.open(&frame), Err(DecodeError::Payload(_))));
    }

    #[test]
    fn truncated_frame_is_a_cipher_error() {
        assert!(matches!(
            handle().open(&Frame::Binary(vec![0; 10])),
            Err(DecodeError::Cipher(SessionCipherError::Truncated { len: 10 }))
        ));
    }
}
