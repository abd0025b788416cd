//! relaychat-relay: run a relay on the given address.
//!
//! `RUST_LOG=relaychat_relay=debug relaychat-relay --bind 127.0.0.1:6789`

use std::time::Duration;

use clap::Parser;
use relaychat_relay::{Relay, RelayConfig};
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "relaychat-relay", version, about = "Encrypted group chat relay")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:6789")]
    bind: String,

    /// Seconds a new connection has to complete the key exchange.
    #[arg(long, default_value_t = 10)]
    handshake_timeout: u64,

    /// Frames queued per peer before further frames to it are dropped.
    #[arg(long, default_value_t = 64)]
    peer_queue: usize,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("relaychat_relay=info")).init();
    if let Err(e) = run(Args::parse()).await {
        eprintln!("✗ {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let relay = Relay::bind(RelayConfig {
        bind:              args.bind,
        handshake_timeout: Duration::from_secs(args.handshake_timeout),
        peer_queue:        args.peer_queue,
    })
    .await?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    log::info!("[relay] Ctrl+C received");
                    cancel.cancel();
                }
                Err(e) => log::warn!("[relay] cannot listen for Ctrl+C: {e}"),
            }
        }
    });

    relay.run_until(cancel).await?;
    Ok(())
}
