use std::io;
use std::net::SocketAddr;

use arena::{
    ClientMessage, InputFlags, NetworkEndpoint, NetworkStats, PlayerVisual, RingIndex,
    ServerMessage, StateUpdate, TickClock, MAX_DATAGRAM_SIZE, MAX_PLAYERS,
};

use super::config::ClientConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unjoined,
    AwaitingJoinResult,
    Joined { slot: u16 },
    Left,
}

/// The client's mirror of the last accepted State message. Rebuilt whole
/// each time; there is no interpolation or cross-tick buffering.
#[derive(Debug, Clone)]
pub struct RemoteView {
    pub players: [Option<PlayerVisual>; MAX_PLAYERS],
    pub speed: f32,
    pub server_tick: u32,
}

impl Default for RemoteView {
    fn default() -> Self {
        Self {
            players: [None; MAX_PLAYERS],
            speed: 0.0,
            server_tick: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SentInput {
    timestamp: u32,
    #[allow(dead_code)]
    tick: u32,
    #[allow(dead_code)]
    flags: InputFlags,
}

/// One connection attempt's worth of client state. Drives the per-tick
/// sequence: drain inbound, decode, apply the last State drained, send
/// one Input, then wait out the tick on the pacer clock.
pub struct GameClient {
    endpoint: NetworkEndpoint,
    config: ClientConfig,
    state: SessionState,
    /// Never shifted; Input timestamps and the join-resend schedule come
    /// from here.
    session_clock: TickClock,
    /// Shifted forward one step per tick to bank the wait.
    pacer: TickClock,
    tick_seconds: f64,
    tick: u32,
    view: RemoteView,
    history: Vec<SentInput>,
    unacked: RingIndex,
    last_join_sent_s: Option<f64>,
    rtt_ms: Option<u32>,
}

impl GameClient {
    pub fn new(server_addr: SocketAddr, config: ClientConfig) -> io::Result<Self> {
        let mut endpoint = NetworkEndpoint::bind("0.0.0.0:0")?;
        endpoint.set_remote(server_addr);

        let tick_seconds = 1.0 / config.tick_rate as f64;
        let history_len = config.input_history;

        Ok(Self {
            endpoint,
            state: SessionState::Unjoined,
            session_clock: TickClock::new(),
            pacer: TickClock::new(),
            tick_seconds,
            tick: 0,
            view: RemoteView::default(),
            history: vec![SentInput::default(); history_len],
            unacked: RingIndex::new(history_len),
            last_join_sent_s: None,
            rtt_ms: None,
            config,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn slot(&self) -> Option<u16> {
        match self.state {
            SessionState::Joined { slot } => Some(slot),
            _ => None,
        }
    }

    pub fn view(&self) -> &RemoteView {
        &self.view
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// Round trip estimated from the server's timestamp echo, in ms.
    pub fn rtt_ms(&self) -> Option<u32> {
        self.rtt_ms
    }

    /// Inputs sent but not yet covered by a State echo.
    pub fn unacked_inputs(&self) -> usize {
        self.unacked.len()
    }

    pub fn stats(&self) -> &NetworkStats {
        self.endpoint.stats()
    }

    /// The network phase of one tick. `flags` is the instantaneous key
    /// state; it is only sent once a slot has been assigned.
    pub fn update(&mut self, flags: InputFlags) {
        self.drain();

        match self.state {
            SessionState::Unjoined => self.send_join(),
            SessionState::AwaitingJoinResult => {
                let elapsed = self.session_clock.elapsed_seconds();
                let due = self
                    .last_join_sent_s
                    .is_none_or(|sent| elapsed - sent >= self.config.join_resend_seconds);
                if due {
                    self.send_join();
                }
            }
            SessionState::Joined { slot } => self.send_input(slot, flags),
            SessionState::Left => {}
        }
    }

    /// Blocks until this tick's boundary and banks the step.
    pub fn finish_tick(&mut self) {
        self.pacer.wait_until(self.tick_seconds);
        self.pacer.shift_start(self.tick_seconds);
        self.tick = self.tick.wrapping_add(1);
    }

    /// Best-effort, unacknowledged session teardown.
    pub fn leave(&mut self) {
        if let SessionState::Joined { slot } = self.state {
            let mut buf = [0u8; MAX_DATAGRAM_SIZE];
            if let Ok(len) = (ClientMessage::Leave { slot }).encode(&mut buf) {
                if let Err(e) = self.endpoint.send(&buf[..len]) {
                    log::warn!("leave failed to send: {e}");
                }
            }
        }
        self.state = SessionState::Left;
    }

    /// Receives while datagrams are available. Several State messages in
    /// one drain collapse to the newest; join results are handled as they
    /// appear.
    fn drain(&mut self) {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let mut latest_state: Option<StateUpdate> = None;

        loop {
            match self.endpoint.receive(&mut buf) {
                Ok(Some((len, addr))) => {
                    if Some(addr) != self.endpoint.remote_addr() {
                        log::debug!("ignoring datagram from stranger {addr}");
                        continue;
                    }
                    match ServerMessage::decode(&buf[..len]) {
                        Ok(ServerMessage::JoinResult { slot }) => self.handle_join_result(slot),
                        Ok(ServerMessage::State(state)) => latest_state = Some(state),
                        Err(e) => {
                            log::warn!("dropping malformed datagram: {e}");
                            self.endpoint.record_malformed();
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    log::warn!("receive failed: {e}");
                    break;
                }
            }
        }

        if let Some(state) = latest_state {
            if matches!(self.state, SessionState::Joined { .. }) {
                self.apply_state(state);
            }
        }
    }

    fn handle_join_result(&mut self, slot: Option<u16>) {
        if self.state != SessionState::AwaitingJoinResult {
            return;
        }

        match slot {
            Some(slot) => {
                log::info!("joined as slot {slot}");
                self.state = SessionState::Joined { slot };
            }
            None => {
                log::error!("server is full");
                self.state = SessionState::Left;
            }
        }
    }

    fn apply_state(&mut self, state: StateUpdate) {
        self.view.players = [None; MAX_PLAYERS];
        for entry in &state.players {
            self.view.players[entry.slot as usize] = Some(entry.visual);
        }
        self.view.speed = state.speed;
        self.view.server_tick = state.tick;

        if state.timestamp_echo != 0 {
            while !self.unacked.is_empty()
                && self.history[self.unacked.index_of(0)].timestamp <= state.timestamp_echo
            {
                self.unacked.pop();
            }
            self.rtt_ms = Some(
                self.session_clock
                    .timestamp_ms()
                    .wrapping_sub(state.timestamp_echo),
            );
        }
    }

    fn send_join(&mut self) {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let len = ClientMessage::Join
            .encode(&mut buf)
            .expect("join fits any buffer");
        if let Err(e) = self.endpoint.send(&buf[..len]) {
            log::warn!("join failed to send: {e}");
            return;
        }

        self.last_join_sent_s = Some(self.session_clock.elapsed_seconds());
        if self.state == SessionState::Unjoined {
            self.state = SessionState::AwaitingJoinResult;
        }
    }

    fn send_input(&mut self, slot: u16, flags: InputFlags) {
        let timestamp = self.session_clock.timestamp_ms();
        let msg = ClientMessage::Input {
            slot,
            flags,
            timestamp,
            tick: self.tick,
        };

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let len = msg.encode(&mut buf).expect("input fits any buffer");
        if let Err(e) = self.endpoint.send(&buf[..len]) {
            log::warn!("input failed to send: {e}");
            return;
        }

        if self.unacked.is_full() {
            self.unacked.pop();
        }
        self.history[self.unacked.tail()] = SentInput {
            timestamp,
            tick: self.tick,
            flags,
        };
        self.unacked.push();
    }
}
