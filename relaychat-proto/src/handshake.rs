//! Sans-IO `ISC` handshake.
//!
//! # Flow
//!
//! ```text
//! // client
//! let (offer, mut hs) = ClientHandshake::start(2048)?;
//! // send offer, then feed every received frame:
//! if let Some(session) = hs.on_frame(&frame)? { /* established */ }
//!
//! // relay
//! let reply = handshake::respond(&offer, &room_key)?;
//! // send reply
//! ```
//!
//! The client owns its [`KeyPair`] for the lifetime of the handshake only;
//! it is dropped as soon as the room key is installed.

use std::{fmt, io};

use relaychat_crypto::{KeyGenError, KeyPair, SESSION_KEY_LEN, SessionKey, generate_keys, oaep, rsa};

use crate::control::{ControlError, ControlMessage};
use crate::frame::Frame;
use crate::session::SessionHandle;

/// Key size used when the caller has no preference.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Smallest client modulus accepted by [`ClientHandshake::start`].
pub const MIN_KEY_BITS: usize = 768;

/// OAEP label for the wrapped room key. Both sides use the empty label.
const LABEL: &[u8] = b"";

// ─── Error ────────────────────────────────────────────────────────────────────

/// Errors that abort a handshake.
#[derive(Debug)]
pub enum HandshakeError {
    /// The peer did not answer in time.
    Timeout,
    /// The transport closed before the handshake finished.
    ConnectionClosed,
    /// A control frame failed to parse or validate.
    MalformedControlFrame(ControlError),
    /// A well-formed frame arrived in a state that does not accept it.
    UnexpectedFrame,
    /// Local key-pair generation failed.
    KeyGeneration(KeyGenError),
    /// The requested key cannot carry a wrapped room key.
    KeySizeTooSmall {
        /// Modulus size that was asked for or offered.
        bits: usize,
    },
    /// Wrapping or unwrapping the room key failed.
    Rsa(rsa::Error),
    /// The unwrapped payload is not a room key.
    InvalidSessionKey {
        /// Length of the unwrapped payload.
        len: usize,
    },
    /// The underlying transport failed.
    Transport(io::Error),
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout                  => write!(f, "handshake timed out"),
            Self::ConnectionClosed         => write!(f, "connection closed during handshake"),
            Self::MalformedControlFrame(e) => write!(f, "malformed control frame: {e}"),
            Self::UnexpectedFrame          => write!(f, "unexpected frame for handshake state"),
            Self::KeyGeneration(e)         => write!(f, "key generation failed: {e}"),
            Self::KeySizeTooSmall { bits }
                => write!(f, "{bits}-bit key is below the {MIN_KEY_BITS}-bit minimum"),
            Self::Rsa(e)                   => write!(f, "room key wrapping failed: {e}"),
            Self::InvalidSessionKey { len }
                => write!(f, "unwrapped {len} bytes, expected a {SESSION_KEY_LEN}-byte room key"),
            Self::Transport(e)             => write!(f, "transport error: {e}"),
        }
    }
}

impl std::error::Error for HandshakeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MalformedControlFrame(e) => Some(e),
            Self::KeyGeneration(e)         => Some(e),
            Self::Rsa(e)                   => Some(e),
            Self::Transport(e)             => Some(e),
            _ => None,
        }
    }
}

impl From<ControlError> for HandshakeError {
    fn from(e: ControlError) -> Self { Self::MalformedControlFrame(e) }
}

impl From<KeyGenError> for HandshakeError {
    fn from(e: KeyGenError) -> Self { Self::KeyGeneration(e) }
}

impl From<rsa::Error> for HandshakeError {
    fn from(e: rsa::Error) -> Self { Self::Rsa(e) }
}

impl From<io::Error> for HandshakeError {
    fn from(e: io::Error) -> Self { Self::Transport(e) }
}

// ─── Client side ─────────────────────────────────────────────────────────────

/// Where a [`ClientHandshake`] currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeState {
    /// Public key sent, waiting for the wrapped room key.
    AwaitingKeyMaterial,
    /// Room key installed; traffic belongs to the [`SessionHandle`].
    Established,
    /// Aborted or closed; no further frames are accepted.
    Closed,
}

/// Client half of the handshake.
#[derive(Debug)]
pub struct ClientHandshake {
    keys:  Option<KeyPair>,
    state: HandshakeState,
}

impl ClientHandshake {
    /// Generate a `bits`-bit key pair and build the offer frame.
    ///
    /// Prime search is CPU-bound; async callers should run this on a blocking
    /// thread or generate the pair there and use [`ClientHandshake::with_keys`].
    pub fn start(bits: usize) -> Result<(Frame, Self), HandshakeError> {
        if bits < MIN_KEY_BITS {
            return Err(HandshakeError::KeySizeTooSmall { bits });
        }
        Self::with_keys(generate_keys(bits)?)
    }

    /// Build the offer frame around an existing key pair.
    pub fn with_keys(keys: KeyPair) -> Result<(Frame, Self), HandshakeError> {
        if oaep::max_message_len(keys.public.modulus_len()) < SESSION_KEY_LEN {
            return Err(HandshakeError::KeySizeTooSmall { bits: keys.public.n().bits() as usize });
        }
        let offer = ControlMessage::OfferPublicKey(keys.public.clone()).to_frame()?;
        log::debug!("[handshake] offering {}-bit public key", keys.public.n().bits());
        Ok((offer, Self { keys: Some(keys), state: HandshakeState::AwaitingKeyMaterial }))
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState { self.state }

    /// Feed one received frame.
    ///
    /// Returns `Ok(None)` for room traffic that arrives before the reply,
    /// `Ok(Some(session))` once the room key is installed. Any error closes
    /// the handshake.
    pub fn on_frame(&mut self, frame: &Frame) -> Result<Option<SessionHandle>, HandshakeError> {
        if self.state != HandshakeState::AwaitingKeyMaterial {
            return Err(HandshakeError::UnexpectedFrame);
        }
        let Frame::Text(text) = frame else {
            log::trace!("[handshake] ignoring {}-byte data frame before key install", frame.len());
            return Ok(None);
        };
        match self.install(text) {
            Ok(session) => {
                self.state = HandshakeState::Established;
                self.keys = None;
                log::debug!("[handshake] room key installed");
                Ok(Some(session))
            }
            Err(e) => {
                self.close();
                Err(e)
            }
        }
    }

    fn install(&self, text: &str) -> Result<SessionHandle, HandshakeError> {
        let ControlMessage::InstallSessionKey(wrapped) = ControlMessage::parse(text)? else {
            return Err(HandshakeError::UnexpectedFrame);
        };
        let keys = self.keys.as_ref().ok_or(HandshakeError::UnexpectedFrame)?;
        let raw = rsa::decrypt(&wrapped, &keys.private, LABEL)?;
        let key = SessionKey::from_slice(&raw)
            .ok_or(HandshakeError::InvalidSessionKey { len: raw.len() })?;
        Ok(SessionHandle::new(key))
    }

    /// Abandon the handshake and drop the private key.
    pub fn close(&mut self) {
        self.state = HandshakeState::Closed;
        self.keys = None;
    }
}

// ─── Relay side ──────────────────────────────────────────────────────────────

/// Wrap `room_key` under the public key offered in `offer`.
pub fn respond(offer: &Frame, room_key: &SessionKey) -> Result<Frame, HandshakeError> {
    let ControlMessage::OfferPublicKey(public) = ControlMessage::from_frame(offer)? else {
        return Err(HandshakeError::UnexpectedFrame);
    };
    let wrapped = rsa::encrypt(room_key.as_bytes(), &public, LABEL)?;
    log::debug!("[handshake] wrapped room key under {}-bit public key", public.n().bits());
    Ok(ControlMessage::InstallSessionKey(wrapped).to_frame()?)
}
