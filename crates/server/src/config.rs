use arena::{DEFAULT_TICK_RATE, MAX_PLAYERS};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub tick_rate: u32,
    pub max_players: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            max_players: MAX_PLAYERS,
        }
    }
}
