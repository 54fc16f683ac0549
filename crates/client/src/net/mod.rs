mod client;
mod config;

pub use client::{GameClient, RemoteView, SessionState};
pub use config::ClientConfig;
