mod config;
mod events;
mod server;
mod simulation;

use anyhow::{bail, Result};
use clap::Parser;

use config::ServerConfig;
use server::GameServer;

#[derive(Parser)]
#[command(name = "arena-server")]
#[command(about = "Arena game server")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = arena::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = arena::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(short, long, default_value_t = arena::MAX_PLAYERS)]
    max_players: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.tick_rate == 0 {
        bail!("tick rate must be non-zero");
    }
    if args.max_players == 0 || args.max_players > arena::MAX_PLAYERS {
        bail!("max players must be in 1..={}", arena::MAX_PLAYERS);
    }

    let config = ServerConfig {
        tick_rate: args.tick_rate,
        max_players: args.max_players,
    };

    let bind_addr = format!("{}:{}", args.bind, args.port);
    let mut server = GameServer::new(&bind_addr, config)?;

    log::info!(
        "server listening on {} ({} ticks/s, {} slots)",
        server.local_addr(),
        args.tick_rate,
        args.max_players
    );
    server.run();
    log::info!("server shutting down");

    Ok(())
}
