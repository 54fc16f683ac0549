mod app;
mod net;

use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use clap::Parser;

use net::{ClientConfig, GameClient};

#[derive(Parser)]
#[command(name = "arena-client")]
#[command(about = "Arena game client")]
struct Args {
    #[arg(short, long, default_value = "127.0.0.1")]
    server: String,

    #[arg(short, long, default_value_t = arena::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = arena::DEFAULT_TICK_RATE)]
    tick_rate: u32,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    if args.tick_rate == 0 {
        bail!("tick rate must be non-zero");
    }

    let addr: SocketAddr = format!("{}:{}", args.server, args.port)
        .parse()
        .context("invalid server address")?;

    let config = ClientConfig {
        tick_rate: args.tick_rate,
        ..Default::default()
    };
    let mut client = GameClient::new(addr, config)?;

    log::info!("connecting to {addr}");
    app::run(&mut client)
}
