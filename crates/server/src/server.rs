use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arena::{
    ClientMessage, InputFlags, NetworkEndpoint, NetworkStats, PlayerNonvisual, PlayerVisual,
    ServerMessage, SessionTable, StateEntry, StateUpdate, TickClock, MAX_DATAGRAM_SIZE,
};

use crate::config::ServerConfig;
use crate::events::ServerEvent;
use crate::simulation::step_player;

/// Newest accepted input for one slot. `last_tick` orders datagrams:
/// anything at or below it is stale or reordered and gets dropped.
#[derive(Debug, Clone, Copy, Default)]
struct PendingInput {
    flags: InputFlags,
    timestamp: u32,
    last_tick: Option<u32>,
}

pub struct GameServer {
    endpoint: NetworkEndpoint,
    sessions: SessionTable,
    config: ServerConfig,
    visuals: Vec<PlayerVisual>,
    nonvisuals: Vec<PlayerNonvisual>,
    inputs: Vec<PendingInput>,
    clock: TickClock,
    tick: u32,
    tick_seconds: f64,
    running: Arc<AtomicBool>,
    pending_events: VecDeque<ServerEvent>,
}

impl GameServer {
    pub fn new(bind_addr: &str, config: ServerConfig) -> io::Result<Self> {
        let endpoint = NetworkEndpoint::bind(bind_addr)?;
        let tick_seconds = 1.0 / config.tick_rate as f64;

        Ok(Self {
            endpoint,
            sessions: SessionTable::new(config.max_players),
            visuals: vec![PlayerVisual::default(); config.max_players],
            nonvisuals: vec![PlayerNonvisual::default(); config.max_players],
            inputs: vec![PendingInput::default(); config.max_players],
            clock: TickClock::new(),
            tick: 0,
            tick_seconds,
            running: Arc::new(AtomicBool::new(true)),
            pending_events: VecDeque::new(),
            config,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn stats(&self) -> &NetworkStats {
        self.endpoint.stats()
    }

    pub fn player_count(&self) -> usize {
        self.sessions.player_count()
    }

    /// Blocks in the fixed-rate loop until the running flag clears.
    pub fn run(&mut self) {
        let running = self.running();
        self.clock.restart();

        while running.load(Ordering::SeqCst) {
            self.tick_once();
            self.log_events();
            self.clock.wait_until(self.tick_seconds);
            self.clock.shift_start(self.tick_seconds);
        }
    }

    /// One tick's worth of work, without the clock wait. Split out so
    /// tests can drive the server synchronously.
    pub fn tick_once(&mut self) {
        self.process_network();
        self.step_players();
        self.broadcast_state();
        self.tick = self.tick.wrapping_add(1);
    }

    fn log_events(&mut self) {
        while let Some(event) = self.pending_events.pop_front() {
            match event {
                ServerEvent::PlayerJoined { slot, addr } => {
                    log::info!("player joined from {addr}, slot {slot}");
                }
                ServerEvent::PlayerLeft { slot, addr } => {
                    log::info!("player in slot {slot} left ({addr})");
                }
                ServerEvent::JoinDenied { addr } => {
                    log::warn!("join from {addr} denied, server full");
                }
                ServerEvent::Error { message } => {
                    log::error!("{message}");
                }
            }
        }
    }

    /// Drains every datagram the OS has queued; anything still arriving
    /// is next tick's work.
    fn process_network(&mut self) {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];

        loop {
            match self.endpoint.receive(&mut buf) {
                Ok(Some((len, addr))) => match ClientMessage::decode(&buf[..len]) {
                    Ok(msg) => self.handle_message(msg, addr),
                    Err(e) => {
                        log::warn!("dropping malformed datagram from {addr}: {e}");
                        self.endpoint.record_malformed();
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    self.pending_events.push_back(ServerEvent::Error {
                        message: format!("receive failed: {e}"),
                    });
                    break;
                }
            }
        }
    }

    fn handle_message(&mut self, msg: ClientMessage, addr: SocketAddr) {
        match msg {
            ClientMessage::Join => self.handle_join(addr),
            ClientMessage::Leave { slot } => self.handle_leave(slot, addr),
            ClientMessage::Input {
                slot,
                flags,
                timestamp,
                tick,
            } => self.handle_input(slot, flags, timestamp, tick, addr),
        }
    }

    fn handle_join(&mut self, addr: SocketAddr) {
        let rejoin = self.sessions.slot_of(addr).is_some();

        match self.sessions.join(addr) {
            Some(slot) => {
                if !rejoin {
                    let i = slot as usize;
                    self.visuals[i] = PlayerVisual::default();
                    self.nonvisuals[i] = PlayerNonvisual::default();
                    self.inputs[i] = PendingInput::default();
                    self.pending_events
                        .push_back(ServerEvent::PlayerJoined { slot, addr });
                }
                self.send_message(&ServerMessage::JoinResult { slot: Some(slot) }, addr);
            }
            None => {
                self.pending_events
                    .push_back(ServerEvent::JoinDenied { addr });
                self.send_message(&ServerMessage::JoinResult { slot: None }, addr);
            }
        }
    }

    fn handle_leave(&mut self, slot: u16, addr: SocketAddr) {
        if !self.sessions.matches(slot, addr) {
            log::warn!("leave for slot {slot} from non-owner {addr}, ignored");
            return;
        }

        self.sessions.leave(slot);
        self.pending_events
            .push_back(ServerEvent::PlayerLeft { slot, addr });
    }

    fn handle_input(&mut self, slot: u16, flags: InputFlags, timestamp: u32, tick: u32, addr: SocketAddr) {
        if !self.sessions.matches(slot, addr) {
            log::warn!("input for slot {slot} from non-owner {addr}, ignored");
            return;
        }

        let input = &mut self.inputs[slot as usize];
        if input.last_tick.is_some_and(|last| tick <= last) {
            log::debug!("stale input for slot {slot} (tick {tick}), ignored");
            return;
        }

        *input = PendingInput {
            flags,
            timestamp,
            last_tick: Some(tick),
        };
    }

    fn step_players(&mut self) {
        let dt = 1.0 / self.config.tick_rate as f32;
        for (slot, _) in self.sessions.iter_present() {
            let i = slot as usize;
            step_player(
                &mut self.visuals[i],
                &mut self.nonvisuals[i],
                self.inputs[i].flags,
                dt,
            );
        }
    }

    /// One State per present player. Entries are shared; the timestamp
    /// echo and nonvisual speed are the recipient's own.
    fn broadcast_state(&mut self) {
        let players: Vec<StateEntry> = self
            .sessions
            .iter_present()
            .map(|(slot, _)| StateEntry {
                slot: slot as u8,
                visual: self.visuals[slot as usize],
            })
            .collect();

        let recipients: Vec<(u16, SocketAddr)> = self.sessions.iter_present().collect();
        for (slot, addr) in recipients {
            let i = slot as usize;
            let msg = ServerMessage::State(StateUpdate {
                tick: self.tick,
                timestamp_echo: self.inputs[i].timestamp,
                speed: self.nonvisuals[i].speed,
                players: players.clone(),
            });
            self.send_message(&msg, addr);
        }
    }

    /// A failed send is logged and the tick proceeds; there is no
    /// same-tick retry. The next tick's State is a full snapshot, so one
    /// lost datagram self-heals.
    fn send_message(&mut self, msg: &ServerMessage, addr: SocketAddr) {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        match msg.encode(&mut buf) {
            Ok(len) => {
                if let Err(e) = self.endpoint.send_to(&buf[..len], addr) {
                    log::warn!("send to {addr} failed: {e}");
                }
            }
            Err(e) => log::error!("encode for {addr} failed: {e}"),
        }
    }
}
