//! Async relaychat client.
//!
//! ```rust,no_run
//! use relaychat_client::{Client, Config};
//! use relaychat_proto::ChatMessage;
//!
//! # async fn f() -> Result<(), relaychat_client::ClientError> {
//! let (client, mut incoming) = Client::connect(Config::default()).await?;
//! client.send(ChatMessage::new("alice", "hi")).await?;
//! while let Some(msg) = incoming.next().await {
//!     println!("{}: {}", msg.username, msg.msg);
//! }
//! client.shutdown().await?;
//! # Ok(()) }
//! ```
//!
//! After the handshake one task owns the connection and the [`SessionHandle`].
//! [`Client`] feeds it outgoing messages and [`Incoming`] drains the decrypted
//! ones, both through bounded channels.

#![deny(unsafe_code)]

pub mod errors;
mod session;

use std::time::Duration;

use relaychat_proto::{ChatMessage, FrameReader, FrameWriter, FramedStream, SessionHandle};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use errors::ClientError;
pub use relaychat_proto::handshake::DEFAULT_KEY_BITS;
pub use session::establish_session;

// ─── Config ───────────────────────────────────────────────────────────────────

/// Connection settings.
#[derive(Clone, Debug)]
pub struct Config {
    /// Relay address, `host:port`.
    pub addr:              String,
    /// Modulus size of this connection's RSA key pair.
    pub key_bits:          usize,
    /// How long to wait for the relay's `ISC` reply.
    pub handshake_timeout: Duration,
    /// How long [`Client::shutdown`] waits before aborting the connection task.
    pub shutdown_timeout:  Duration,
    /// Capacity of the outgoing and incoming message queues.
    pub channel_capacity:  usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr:              "127.0.0.1:6789".to_string(),
            key_bits:          DEFAULT_KEY_BITS,
            handshake_timeout: Duration::from_secs(10),
            shutdown_timeout:  Duration::from_secs(5),
            channel_capacity:  64,
        }
    }
}

// ─── Incoming ─────────────────────────────────────────────────────────────────

/// Decrypted chat messages from other room members.
pub struct Incoming {
    rx: mpsc::Receiver<ChatMessage>,
}

impl Incoming {
    /// Wait for the next message. Returns `None` once the connection has closed.
    pub async fn next(&mut self) -> Option<ChatMessage> {
        self.rx.recv().await
    }
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// Handle to an established connection.
///
/// Dropping it cancels the connection task without waiting.
pub struct Client {
    outbound:         mpsc::Sender<ChatMessage>,
    cancel:           CancellationToken,
    task:             JoinHandle<()>,
    shutdown_timeout: Duration,
}

impl Client {
    /// Connect over TCP and complete the handshake.
    pub async fn connect(config: Config) -> Result<(Self, Incoming), ClientError> {
        let stream = TcpStream::connect(&config.addr).await?;
        stream.set_nodelay(true)?;
        log::info!("[client] connected to {}", config.addr);
        Self::with_stream(stream, config).await
    }

    /// Complete the handshake over an already-open byte stream.
    pub async fn with_stream<S>(stream: S, config: Config) -> Result<(Self, Incoming), ClientError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let mut framed = FramedStream::new(stream);
        let session = establish_session(&mut framed, config.key_bits, config.handshake_timeout).await?;
        log::info!("[client] room key installed ✓");

        let (reader, writer) = framed.into_split();
        let capacity = config.channel_capacity.max(1);
        let (out_tx, out_rx) = mpsc::channel(capacity);
        let (in_tx, in_rx)   = mpsc::channel(capacity);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_connection(
            session,
            reader,
            writer,
            out_rx,
            in_tx,
            cancel.clone(),
        ));

        let client = Self { outbound: out_tx, cancel, task, shutdown_timeout: config.shutdown_timeout };
        Ok((client, Incoming { rx: in_rx }))
    }

    /// Encrypt and send `message` to the room.
    pub async fn send(&self, message: ChatMessage) -> Result<(), ClientError> {
        self.outbound.send(message).await.map_err(|_| ClientError::Disconnected)
    }

    /// `true` once the connection task has exited.
    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the connection task, waiting at most the configured shutdown timeout.
    pub async fn shutdown(mut self) -> Result<(), ClientError> {
        self.cancel.cancel();
        match tokio::time::timeout(self.shutdown_timeout, &mut self.task).await {
            Ok(_) => {
                log::info!("[client] disconnected");
                Ok(())
            }
            Err(_) => {
                log::warn!(
                    "[client] connection task still running after {:?}; aborting",
                    self.shutdown_timeout,
                );
                self.task.abort();
                Err(ClientError::ShutdownTimeout)
            }
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ─── Connection task ──────────────────────────────────────────────────────────

async fn run_connection<R, W>(
    session:      SessionHandle,
    mut reader:   FrameReader<R>,
    mut writer:   FrameWriter<W>,
    mut outbound: mpsc::Receiver<ChatMessage>,
    inbound:      mpsc::Sender<ChatMessage>,
    cancel:       CancellationToken,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            frame = reader.recv() => match frame {
                Ok(Some(frame)) => match session.open(&frame) {
                    Ok(message) => {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            // Receiver gone: keep running so sends still work.
                            _ = inbound.send(message) => {}
                        }
                    }
                    Err(e) => log::warn!("[client] dropping {}-byte frame: {e}", frame.len()),
                },
                Ok(None) => {
                    log::info!("[client] relay closed the connection");
                    break;
                }
                Err(e) => {
                    log::warn!("[client] read failed: {e}");
                    break;
                }
            },

            message = outbound.recv() => {
                let Some(message) = message else { break };
                let frame = match session.seal(&message) {
                    Ok(frame) => frame,
                    Err(e) => {
                        log::warn!("[client] could not encode message: {e}");
                        continue;
                    }
                };
                if let Err(e) = writer.send(&frame).await {
                    log::warn!("[client] write failed: {e}");
                    break;
                }
            }
        }
    }
    if let Err(e) = writer.close().await {
        log::debug!("[client] close: {e}");
    }
}
