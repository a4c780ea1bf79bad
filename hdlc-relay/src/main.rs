//! Entry point for `hdlc-relay`.
//!
//! Parses CLI arguments and dispatches into either **relay** or **station**
//! mode.  All protocol work is delegated to library modules; `main.rs` owns
//! only process setup (logging, argument parsing, terminal I/O).

use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use hdlc_relay::{HandshakePolicy, Relay, RelayConfig, Station, StationConfig, DEFAULT_PORT};

/// HDLC-style text relay over TCP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Run the relay; exits once every station that joined has left.
    Relay {
        /// TCP port to listen on.
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Wait for a new station in each cycle (milliseconds).
        #[arg(long, default_value_t = 250)]
        accept_timeout_ms: u64,
        /// Wait for a station's answer to a poll (milliseconds).
        #[arg(long, default_value_t = 2000)]
        poll_timeout_ms: u64,
        /// Fail handshakes answered with the wrong frame.
        #[arg(long)]
        strict_handshake: bool,
    },
    /// Run an interactive station reading lines from stdin.
    ///
    /// `@A.B.C.D text` sends to a specific station, `/quit` disconnects.
    Station {
        /// Relay address.
        #[arg(short, long, default_value = "127.0.0.1:4444")]
        server: String,
        /// Station address announced to the relay.
        #[arg(short, long)]
        address: Option<Ipv4Addr>,
        /// Default destination for plain lines.
        #[arg(long)]
        to: Option<Ipv4Addr>,
        /// Name prefixed to every plain line.
        #[arg(short, long, default_value = "Anonymous")]
        name: String,
        #[arg(long)]
        strict_handshake: bool,
    },
}

fn policy(strict: bool) -> HandshakePolicy {
    if strict {
        HandshakePolicy::Strict
    } else {
        HandshakePolicy::Lenient
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Relay {
            port,
            accept_timeout_ms,
            poll_timeout_ms,
            strict_handshake,
        } => {
            let config = RelayConfig {
                accept_timeout: Duration::from_millis(accept_timeout_ms),
                poll_timeout: Duration::from_millis(poll_timeout_ms),
                handshake: policy(strict_handshake),
                ..RelayConfig::default()
            };
            let mut relay = Relay::listen(port, config)
                .await
                .with_context(|| format!("cannot listen on port {port}"))?;
            relay.run_until_empty().await;
        }
        Mode::Station {
            server,
            address,
            to,
            name,
            strict_handshake,
        } => {
            let config = StationConfig {
                address,
                default_destination: to,
                handshake: policy(strict_handshake),
                ..StationConfig::default()
            };
            run_station(&server, config, &name).await?;
        }
    }

    Ok(())
}

async fn run_station(server: &str, config: StationConfig, name: &str) -> Result<()> {
    let Some(addr) = tokio::net::lookup_host(server)
        .await
        .with_context(|| format!("cannot resolve {server}"))?
        .next()
    else {
        bail!("{server} resolved to no address");
    };

    let mut station = Station::connect(addr, config)
        .await
        .with_context(|| format!("cannot attach to relay at {addr}"))?;
    println!("connected as {}", station.address());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line == "/quit" {
                    break;
                }
                if line.is_empty() {
                    continue;
                }
                let sent = match parse_directed(line) {
                    Some((to, text)) => station.send_user_text_to(to, format!("{name}: {text}")).await,
                    None => station.send_user_text(format!("{name}: {line}")).await,
                };
                if let Err(e) = sent {
                    eprintln!("not sent: {e}");
                }
            }
            delivered = station.recv() => match delivered {
                Some(text) => println!("{text}"),
                None => {
                    eprintln!("relay closed the session");
                    return Ok(());
                }
            },
        }
    }

    station.disconnect().await;
    Ok(())
}

/// Split `@A.B.C.D text` into its destination and text.
fn parse_directed(line: &str) -> Option<(Ipv4Addr, &str)> {
    let rest = line.strip_prefix('@')?;
    let (to, text) = rest.split_once(' ')?;
    Some((to.parse().ok()?, text.trim_start()))
}
