//! relaychat relay.
//!
//! One task per connection. Each new connection is registered immediately,
//! receives the process-wide room key wrapped under its own RSA public key,
//! and from then on every binary frame it sends is queued, unmodified, for
//! every other registered connection. The relay never decrypts chat traffic.
//!
//! ```rust,no_run
//! use relaychat_relay::{Relay, RelayConfig};
//!
//! # async fn f() -> std::io::Result<()> {
//! Relay::bind(RelayConfig::default()).await?.run().await
//! # }
//! ```

#![deny(unsafe_code)]

pub mod registry;
mod server;

use std::time::Duration;

pub use registry::{PeerId, Registry};
pub use server::Relay;

/// Relay settings.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Listen address, `host:port`.
    pub bind:              String,
    /// How long a new connection has to send its public key.
    pub handshake_timeout: Duration,
    /// Per-peer outbox capacity; frames beyond it are dropped for that peer.
    pub peer_queue:        usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind:              "0.0.0.0:6789".to_string(),
            handshake_timeout: Duration::from_secs(10),
            peer_queue:        64,
        }
    }
}
