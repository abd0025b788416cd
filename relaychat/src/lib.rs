//! # relaychat: encrypted group chat through a relay
//!
//! | Sub-crate          | Role                                                      |
//! |--------------------|-----------------------------------------------------------|
//! | `relaychat-crypto` | Primes, RSA keys, OAEP, RSA engine, AES-CBC room cipher   |
//! | `relaychat-proto`  | Frames, `ISC` control messages, handshake, framed transport |
//! | `relaychat-client` | Async client: handshake + send/receive task               |
//! | `relaychat-relay`  | Relay: wraps the room key per member, fans out frames     |
//!
//! ## Quick start: sans-IO handshake
//!
//! ```rust,no_run
//! use relaychat::{ChatMessage, ClientHandshake, SessionKey, handshake};
//!
//! let room = SessionKey::generate();
//! let (offer, mut hs) = ClientHandshake::start(2048).unwrap();
//! let reply = handshake::respond(&offer, &room).unwrap();
//! let session = hs.on_frame(&reply).unwrap().unwrap();
//!
//! let frame = session.seal(&ChatMessage::new("alice", "hi")).unwrap();
//! assert_eq!(session.open(&frame).unwrap().msg, "hi");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Re-export of [`relaychat_crypto`]: primes, RSA, OAEP, session cipher.
pub use relaychat_crypto as crypto;

/// Re-export of [`relaychat_proto`]: frames, control messages, handshake, transport.
pub use relaychat_proto as proto;

/// Re-export of [`relaychat_client`] (requires `feature = "client"`).
#[cfg(feature = "client")]
pub use relaychat_client as client;

/// Re-export of [`relaychat_relay`] (requires `feature = "relay"`).
#[cfg(feature = "relay")]
pub use relaychat_relay as relay;

// ─── Convenience re-exports ───────────────────────────────────────────────────

pub use relaychat_crypto::{KeyPair, PrivateKey, PublicKey, SessionKey, generate_keys};
pub use relaychat_proto::handshake;
pub use relaychat_proto::{
    ChatMessage,
    ClientHandshake,
    ControlMessage,
    Frame,
    HandshakeError,
    SessionHandle,
};
