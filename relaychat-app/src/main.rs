//! relaychat-app: terminal chat client.
//!
//!   cargo run -p relaychat-app -- --server 127.0.0.1:6789 --username alice
//!
//! Each line typed is sent to the room; incoming messages are printed with a
//! local `[HH:MM]` timestamp. EOF (Ctrl+D) or Ctrl+C leaves the room.

use std::io::{self, BufRead, Write};

use chrono::Local;
use clap::Parser;
use relaychat_client::{Client, Config, DEFAULT_KEY_BITS};
use relaychat_proto::ChatMessage;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "relaychat-app", version, about = "Encrypted group chat client")]
struct Args {
    /// Relay address, `host:port`.
    #[arg(long, default_value = "127.0.0.1:6789")]
    server: String,

    /// Name shown to other members. Prompted for when absent.
    #[arg(long)]
    username: Option<String>,

    /// RSA modulus size used for the key exchange.
    #[arg(long, default_value_t = DEFAULT_KEY_BITS)]
    key_bits: usize,
}

#[tokio::main]
async fn main() {
    // RUST_LOG=relaychat_client=debug overrides the default
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("relaychat_client=warn")).init();

    if let Err(e) = run(Args::parse()).await {
        eprintln!("\n✗ {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let username = match args.username {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => loop {
            let name = prompt("Username: ")?;
            if !name.is_empty() {
                break name;
            }
        },
    };

    println!("🔌 Connecting to {} …", args.server);
    let (client, mut incoming) = Client::connect(Config {
        addr:     args.server,
        key_bits: args.key_bits,
        ..Default::default()
    }).await?;
    println!("🔒 Joined as {username} (Ctrl+D to leave)\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                client.send(ChatMessage::new(username.as_str(), text)).await?;
                println!("{} You: {text}", stamp());
            }
            message = incoming.next() => match message {
                Some(m) => println!("{} {}: {}", stamp(), m.username, m.msg),
                None => {
                    println!("✗ Connection closed by relay");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.shutdown().await?;
    println!("👋 Left the room");
    Ok(())
}

fn stamp() -> String {
    Local::now().format("[%H:%M]").to_string()
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{msg}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
    }
    Ok(line.trim().to_string())
}
