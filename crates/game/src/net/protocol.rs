use bitflags::bitflags;

pub const DEFAULT_PORT: u16 = 27015;
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Slot indices inside a State entry are a single byte, so this can never
/// exceed 255.
pub const MAX_PLAYERS: usize = 32;

const STATE_HEADER_SIZE: usize = 14;
const STATE_ENTRY_SIZE: usize = 13;

/// Largest datagram either direction produces: a full State message.
pub const MAX_DATAGRAM_SIZE: usize = STATE_HEADER_SIZE + MAX_PLAYERS * STATE_ENTRY_SIZE;

// One leading byte per datagram selects the message kind. The two
// directions are decoded separately but share the discriminant space, so
// the ranges must stay disjoint.
const KIND_JOIN: u8 = 0;
const KIND_LEAVE: u8 = 1;
const KIND_INPUT: u8 = 2;
const KIND_JOIN_RESULT: u8 = 3;
const KIND_STATE: u8 = 4;

bitflags! {
    /// One tick's worth of directional input, packed into the single byte
    /// the Input message carries. Building from `bool`s normalizes any
    /// truthy source value to exactly one bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InputFlags: u8 {
        const UP = 1;
        const DOWN = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
    }
}

impl InputFlags {
    pub fn from_directions(up: bool, down: bool, left: bool, right: bool) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::UP, up);
        flags.set(Self::DOWN, down);
        flags.set(Self::LEFT, left);
        flags.set(Self::RIGHT, right);
        flags
    }
}

/// Per-player state every observer needs; authoritative on the server.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerVisual {
    pub x: f32,
    pub y: f32,
    pub facing: f32,
}

/// Per-player state only the owning client receives.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerNonvisual {
    pub speed: f32,
}

/// One present player's entry inside a State message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateEntry {
    pub slot: u8,
    pub visual: PlayerVisual,
}

/// Full-state snapshot built per recipient: `timestamp_echo` and `speed`
/// belong to the recipient, `players` lists every present slot. Sparse by
/// construction; decoders must trust `num_players`, never `MAX_PLAYERS`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StateUpdate {
    pub tick: u32,
    /// Most recent Input timestamp the server had processed for this
    /// recipient when the packet was built.
    pub timestamp_echo: u32,
    pub speed: f32,
    pub players: Vec<StateEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Join,
    Leave {
        slot: u16,
    },
    Input {
        slot: u16,
        flags: InputFlags,
        timestamp: u32,
        tick: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// `slot` is `None` when the server had no free slot.
    JoinResult { slot: Option<u16> },
    State(StateUpdate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },
    #[error("state update lists too many players ({0})")]
    TooManyPlayers(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("empty datagram")]
    Empty,
    #[error("unknown message kind {0}")]
    UnknownKind(u8),
    #[error("datagram truncated")]
    Truncated,
    #[error("state entry slot {0} out of range")]
    SlotOutOfRange(u8),
}

// All multi-byte fields are little-endian, pinned explicitly so mixed
// deployments agree on the wire.
struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        let end = self.pos + bytes.len();
        if end > self.buf.len() {
            return Err(EncodeError::BufferTooSmall {
                needed: end,
                available: self.buf.len(),
            });
        }
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    fn put_u8(&mut self, v: u8) -> Result<(), EncodeError> {
        self.put(&[v])
    }

    fn put_u16(&mut self, v: u16) -> Result<(), EncodeError> {
        self.put(&v.to_le_bytes())
    }

    fn put_u32(&mut self, v: u32) -> Result<(), EncodeError> {
        self.put(&v.to_le_bytes())
    }

    fn put_f32(&mut self, v: f32) -> Result<(), EncodeError> {
        self.put(&v.to_le_bytes())
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self.pos + N;
        let bytes = self
            .buf
            .get(self.pos..end)
            .ok_or(DecodeError::Truncated)?
            .try_into()
            .expect("slice length checked");
        self.pos = end;
        Ok(bytes)
    }

    fn take_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take::<1>()?[0])
    }

    fn take_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    fn take_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn take_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.take()?))
    }
}

impl ClientMessage {
    /// Writes the message into `buf` and returns the number of bytes
    /// used. Never allocates.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, EncodeError> {
        let mut w = Writer::new(buf);
        match *self {
            ClientMessage::Join => {
                w.put_u8(KIND_JOIN)?;
            }
            ClientMessage::Leave { slot } => {
                w.put_u8(KIND_LEAVE)?;
                w.put_u16(slot)?;
            }
            ClientMessage::Input {
                slot,
                flags,
                timestamp,
                tick,
            } => {
                w.put_u8(KIND_INPUT)?;
                w.put_u16(slot)?;
                w.put_u8(flags.bits())?;
                w.put_u32(timestamp)?;
                w.put_u32(tick)?;
            }
        }
        Ok(w.pos)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(buf);
        match r.take_u8().map_err(|_| DecodeError::Empty)? {
            KIND_JOIN => Ok(ClientMessage::Join),
            KIND_LEAVE => Ok(ClientMessage::Leave {
                slot: r.take_u16()?,
            }),
            KIND_INPUT => Ok(ClientMessage::Input {
                slot: r.take_u16()?,
                flags: InputFlags::from_bits_truncate(r.take_u8()?),
                timestamp: r.take_u32()?,
                tick: r.take_u32()?,
            }),
            kind => Err(DecodeError::UnknownKind(kind)),
        }
    }
}

impl ServerMessage {
    /// Writes the message into `buf` and returns the number of bytes
    /// used. Never allocates; a full State needs [`MAX_DATAGRAM_SIZE`]
    /// bytes.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, EncodeError> {
        let mut w = Writer::new(buf);
        match self {
            ServerMessage::JoinResult { slot } => {
                w.put_u8(KIND_JOIN_RESULT)?;
                match slot {
                    Some(slot) => {
                        w.put_u8(1)?;
                        w.put_u16(*slot)?;
                    }
                    None => w.put_u8(0)?,
                }
            }
            ServerMessage::State(state) => {
                if state.players.len() > MAX_PLAYERS {
                    return Err(EncodeError::TooManyPlayers(state.players.len()));
                }

                w.put_u8(KIND_STATE)?;
                w.put_u32(state.tick)?;
                w.put_u32(state.timestamp_echo)?;
                w.put_f32(state.speed)?;
                w.put_u8(state.players.len() as u8)?;
                for entry in &state.players {
                    w.put_u8(entry.slot)?;
                    w.put_f32(entry.visual.x)?;
                    w.put_f32(entry.visual.y)?;
                    w.put_f32(entry.visual.facing)?;
                }
            }
        }
        Ok(w.pos)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(buf);
        match r.take_u8().map_err(|_| DecodeError::Empty)? {
            KIND_JOIN_RESULT => {
                let slot = match r.take_u8()? {
                    0 => None,
                    _ => Some(r.take_u16()?),
                };
                Ok(ServerMessage::JoinResult { slot })
            }
            KIND_STATE => {
                let tick = r.take_u32()?;
                let timestamp_echo = r.take_u32()?;
                let speed = r.take_f32()?;
                let num_players = r.take_u8()?;

                let mut players = Vec::with_capacity(num_players as usize);
                for _ in 0..num_players {
                    let slot = r.take_u8()?;
                    if slot as usize >= MAX_PLAYERS {
                        return Err(DecodeError::SlotOutOfRange(slot));
                    }
                    players.push(StateEntry {
                        slot,
                        visual: PlayerVisual {
                            x: r.take_f32()?,
                            y: r.take_f32()?,
                            facing: r.take_f32()?,
                        },
                    });
                }

                Ok(ServerMessage::State(StateUpdate {
                    tick,
                    timestamp_echo,
                    speed,
                    players,
                }))
            }
            kind => Err(DecodeError::UnknownKind(kind)),
        }
    }
}
