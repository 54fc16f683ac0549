pub mod clock;
pub mod net;
pub mod ring;

pub use clock::TickClock;
pub use net::{
    ClientMessage, DecodeError, EncodeError, InputFlags, NetworkEndpoint, NetworkStats,
    PlayerNonvisual, PlayerVisual, ServerMessage, SessionTable, StateEntry, StateUpdate,
    DEFAULT_PORT, DEFAULT_TICK_RATE, MAX_DATAGRAM_SIZE, MAX_PLAYERS,
};
pub use ring::RingIndex;
