//! Live connections and fan-out.
//!
//! Each peer owns a bounded outbox drained by its own writer task. The
//! registry only ever `try_send`s into those outboxes, so a slow or dead
//! peer loses frames instead of stalling everyone else.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use relaychat_proto::Frame;
use tokio::sync::{Mutex, mpsc, mpsc::error::TrySendError};

/// Connection identity, unique for the lifetime of a [`Registry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    peers:   HashMap<PeerId, mpsc::Sender<Frame>>,
}

/// Shared set of connected peers. Clones refer to the same set.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<Mutex<Inner>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer whose frames are delivered through `outbox`.
    pub async fn register(&self, outbox: mpsc::Sender<Frame>) -> PeerId {
        let mut inner = self.inner.lock().await;
        let id = PeerId(inner.next_id);
        inner.next_id += 1;
        inner.peers.insert(id, outbox);
        id
    }

    /// Remove a peer. Returns `false` if it was not registered.
    pub async fn unregister(&self, id: PeerId) -> bool {
        self.inner.lock().await.peers.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.peers.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Queue `frame` for every peer except `from`. Returns how many accepted it.
    pub async fn broadcast(&self, from: PeerId, frame: &Frame) -> usize {
        let inner = self.inner.lock().await;
        let mut delivered = 0;
        for (&id, outbox) in &inner.peers {
            if id == from {
                continue;
            }
            match outbox.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    log::warn!("[relay] {id} outbox full; dropping {}-byte frame", frame.len());
                }
                Err(TrySendError::Closed(_)) => {
                    log::debug!("[relay] {id} outbox closed; skipping");
                }
            }
        }
        delivered
    }
}
