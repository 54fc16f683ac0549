mod endpoint;
mod protocol;
mod session;
mod stats;

pub use endpoint::NetworkEndpoint;
pub use protocol::{
    ClientMessage, DecodeError, EncodeError, InputFlags, PlayerNonvisual, PlayerVisual,
    ServerMessage, StateEntry, StateUpdate, DEFAULT_PORT, DEFAULT_TICK_RATE, MAX_DATAGRAM_SIZE,
    MAX_PLAYERS,
};
pub use session::SessionTable;
pub use stats::NetworkStats;
