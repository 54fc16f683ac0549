use arena::DEFAULT_TICK_RATE;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub tick_rate: u32,
    /// How often Join is re-sent while no JoinResult has arrived.
    pub join_resend_seconds: f64,
    /// Capacity of the unacknowledged-input history window.
    pub input_history: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            join_resend_seconds: 1.0,
            input_history: 64,
        }
    }
}
