//! osc_listen: print every OSC datagram arriving on a UDP port.
//!
//! Handy for checking what `aruco_hands` emits without a full receiver:
//!
//! ```text
//! osc_listen --port 8000
//! /aruco/marker ,iffffffff 7 0.0500 0.0500 0.5500 0.0500 …
//! ```

use std::net::UdpSocket;

use anyhow::{Context, Result};
use aruco_osc::OscMessage;
use clap::Parser;
use tracing::warn;

#[derive(Parser)]
#[command(name = "osc_listen", about = "Decode and print incoming OSC messages")]
struct Cli {
    /// Local address to bind
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Local UDP port to listen on
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Only print messages whose address starts with this prefix
    #[arg(long)]
    filter: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let socket = UdpSocket::bind((cli.bind.as_str(), cli.port))
        .with_context(|| format!("binding {}:{}", cli.bind, cli.port))?;
    println!("  listening on {}", socket.local_addr()?);

    let mut buf = vec![0u8; 65_536];
    loop {
        let (n, from) = socket.recv_from(&mut buf).context("receiving datagram")?;
        match OscMessage::from_bytes(&buf[..n]) {
            Ok(msg) => {
                if cli.filter.as_deref().map_or(true, |f| msg.address().starts_with(f)) {
                    println!("{}", msg);
                }
            }
            Err(e) => warn!(%from, bytes = n, "undecodable datagram: {}", e),
        }
    }
}
