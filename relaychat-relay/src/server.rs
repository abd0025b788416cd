//! Accept loop and per-connection tasks.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use relaychat_crypto::SessionKey;
use relaychat_proto::handshake::{self, HandshakeError};
use relaychat_proto::{Frame, FrameReader, FramedStream};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::RelayConfig;
use crate::registry::{PeerId, Registry};

/// Pause after a failed `accept` (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

struct Shared {
    registry: Registry,
    room_key: SessionKey,
    config:   RelayConfig,
}

/// A bound relay with its room key.
pub struct Relay {
    listener: TcpListener,
    shared:   Arc<Shared>,
}

impl Relay {
    /// Bind the listener and generate the room key for this process.
    pub async fn bind(config: RelayConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(&config.bind).await?;
        log::info!("[relay] listening on {}", listener.local_addr()?);
        let shared = Shared { registry: Registry::new(), room_key: SessionKey::generate(), config };
        Ok(Self { listener, shared: Arc::new(shared) })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The live connection set.
    pub fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    /// Accept connections forever.
    pub async fn run(self) -> io::Result<()> {
        self.run_until(CancellationToken::new()).await
    }

    /// Accept connections until `cancel` fires, then close every connection
    /// and wait for their tasks.
    pub async fn run_until(self, cancel: CancellationToken) -> io::Result<()> {
        let tracker = TaskTracker::new();
        loop {
            let (stream, addr) = tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        log::warn!("[relay] accept failed: {e}");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
            };
            if let Err(e) = stream.set_nodelay(true) {
                log::debug!("[relay] set_nodelay for {addr}: {e}");
            }
            let shared = Arc::clone(&self.shared);
            let cancel = cancel.child_token();
            tracker.spawn(handle_connection(stream, addr, shared, cancel));
        }

        log::info!("[relay] shutting down ({} connections)", tracker.len());
        tracker.close();
        tracker.wait().await;
        Ok(())
    }
}

// ─── Connection ───────────────────────────────────────────────────────────────

async fn handle_connection<S>(
    stream: S,
    addr:   SocketAddr,
    shared: Arc<Shared>,
    cancel: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut reader, mut writer) = FramedStream::new(stream).into_split();
    let (outbox, mut rx) = mpsc::channel::<Frame>(shared.config.peer_queue.max(1));
    let id = shared.registry.register(outbox.clone()).await;
    log::info!("[relay] {id} connected from {addr} ({} online)", shared.registry.len().await);

    let writer_cancel = cancel.child_token();
    let writer_task = tokio::spawn({
        let cancel = writer_cancel.clone();
        async move {
            loop {
                let frame = tokio::select! {
                    _ = cancel.cancelled() => break,
                    frame = rx.recv() => match frame {
                        Some(frame) => frame,
                        None => break,
                    },
                };
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = writer.send(&frame) => if let Err(e) = sent {
                        log::debug!("[relay] {id} write failed: {e}");
                        break;
                    },
                }
            }
            if let Err(e) = writer.close().await {
                log::debug!("[relay] {id} close: {e}");
            }
        }
    });

    let handshake = tokio::select! {
        _ = cancel.cancelled() => Ok(false),
        done = tokio::time::timeout(
            shared.config.handshake_timeout,
            install_room_key(&mut reader, &outbox, &shared.room_key),
        ) => match done {
            Ok(result) => result.map(|()| true),
            Err(_) => Err(HandshakeError::Timeout),
        },
    };

    match handshake {
        Ok(true) => {
            log::info!("[relay] {id} room key installed ✓");
            match forward(&mut reader, id, &shared.registry, &cancel).await {
                Ok(()) => log::info!("[relay] {id} disconnected"),
                Err(e) => log::warn!("[relay] {id} read failed: {e}"),
            }
        }
        Ok(false) => {}
        Err(e) => log::warn!("[relay] {id} handshake failed: {e}"),
    }

    shared.registry.unregister(id).await;
    writer_cancel.cancel();
    if let Err(e) = writer_task.await {
        log::warn!("[relay] {id} writer task: {e}");
    }
}

async fn install_room_key<R>(
    reader:   &mut FrameReader<R>,
    outbox:   &mpsc::Sender<Frame>,
    room_key: &SessionKey,
) -> Result<(), HandshakeError>
where
    R: AsyncRead + Unpin,
{
    let offer = reader.recv().await?.ok_or(HandshakeError::ConnectionClosed)?;
    // modpow over a client-chosen modulus; keep it off the async workers.
    let room_key = room_key.clone();
    let reply = tokio::task::spawn_blocking(move || handshake::respond(&offer, &room_key))
        .await
        .map_err(|e| HandshakeError::Transport(io::Error::other(e)))??;
    outbox.send(reply).await.map_err(|_| HandshakeError::ConnectionClosed)
}

/// Fan out binary frames until the peer leaves or `cancel` fires.
async fn forward<R>(
    reader:   &mut FrameReader<R>,
    id:       PeerId,
    registry: &Registry,
    cancel:   &CancellationToken,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            frame = reader.recv() => match frame? {
                Some(frame) => frame,
                None => return Ok(()),
            },
        };
        match frame {
            Frame::Binary(_) => {
                let delivered = registry.broadcast(id, &frame).await;
                log::trace!("[relay] {id} → {delivered} peers ({} bytes)", frame.len());
            }
            Frame::Text(_) => {
                log::warn!("[relay] {id} sent a control frame after the handshake; dropped");
            }
        }
    }
}
