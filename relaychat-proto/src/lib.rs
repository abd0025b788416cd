//! relaychat wire protocol and handshake.
//!
//! This crate handles:
//! * Frame model (text control frames, binary data frames)
//! * `ISC` control messages carrying a public key or a wrapped room key
//! * The sans-IO client handshake and the relay's key-wrapping step
//! * [`SessionHandle`]: wrap/unwrap of every payload after the handshake
//! * A pluggable async [`Transport`] plus a length-prefixed framing over any
//!   tokio byte stream

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod chat;
pub mod control;
pub mod frame;
pub mod handshake;
pub mod session;
pub mod transport;

pub use chat::ChatMessage;
pub use control::{ControlError, ControlMessage};
pub use frame::Frame;
pub use handshake::{ClientHandshake, HandshakeError, HandshakeState};
pub use session::{DecodeError, SessionHandle};
pub use transport::{FrameReader, FrameWriter, FramedStream, Transport};
