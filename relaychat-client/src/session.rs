//! Client side of the `ISC` handshake over a live [`Transport`].

use std::io;
use std::time::Duration;

use relaychat_proto::handshake::MIN_KEY_BITS;
use relaychat_proto::{ClientHandshake, HandshakeError, SessionHandle, Transport};

/// Generate a key pair, offer it, and wait for the wrapped room key.
///
/// Key generation runs on the blocking pool. Only the wait for the relay's
/// reply is bounded by `timeout`.
pub async fn establish_session<T: Transport>(
    transport: &mut T,
    key_bits:  usize,
    timeout:   Duration,
) -> Result<SessionHandle, HandshakeError> {
    if key_bits < MIN_KEY_BITS {
        return Err(HandshakeError::KeySizeTooSmall { bits: key_bits });
    }
    let (offer, mut handshake) = tokio::task::spawn_blocking(move || ClientHandshake::start(key_bits))
        .await
        .map_err(|e| HandshakeError::Transport(io::Error::other(e)))??;

    transport.send(offer).await?;
    log::debug!("[client] public key sent, awaiting room key");

    match tokio::time::timeout(timeout, await_reply(transport, &mut handshake)).await {
        Ok(result) => result,
        Err(_) => {
            handshake.close();
            Err(HandshakeError::Timeout)
        }
    }
}

async fn await_reply<T: Transport>(
    transport: &mut T,
    handshake: &mut ClientHandshake,
) -> Result<SessionHandle, HandshakeError> {
    loop {
        let Some(frame) = transport.recv().await? else {
            handshake.close();
            return Err(HandshakeError::ConnectionClosed);
        };
        if let Some(session) = handshake.on_frame(&frame)? {
            return Ok(session);
        }
    }
}
