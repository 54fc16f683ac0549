use std::net::SocketAddr;

/// Server-side endpoint-to-slot table. A slot holding `Some(addr)` is
/// occupied; `None` is free. Slots are assigned lowest-free-first and stay
/// stable for the life of the session.
#[derive(Debug)]
pub struct SessionTable {
    endpoints: Vec<Option<SocketAddr>>,
}

impl SessionTable {
    /// `max_players` must fit the one-byte slot index a State entry
    /// carries.
    pub fn new(max_players: usize) -> Self {
        assert!(max_players <= u8::MAX as usize + 1);
        Self {
            endpoints: vec![None; max_players],
        }
    }

    pub fn capacity(&self) -> usize {
        self.endpoints.len()
    }

    pub fn player_count(&self) -> usize {
        self.endpoints.iter().filter(|e| e.is_some()).count()
    }

    /// Allocates the lowest free slot for `addr`, or returns the slot it
    /// already holds — a client whose JoinResult was lost re-sends Join
    /// and must get the same answer. `None` means the table is full.
    pub fn join(&mut self, addr: SocketAddr) -> Option<u16> {
        if let Some(slot) = self.slot_of(addr) {
            return Some(slot);
        }

        let free = self.endpoints.iter().position(|e| e.is_none())?;
        self.endpoints[free] = Some(addr);
        Some(free as u16)
    }

    /// Frees `slot`. Clearing an already-free or out-of-range slot is a
    /// no-op.
    pub fn leave(&mut self, slot: u16) {
        if let Some(entry) = self.endpoints.get_mut(slot as usize) {
            *entry = None;
        }
    }

    pub fn endpoint(&self, slot: u16) -> Option<SocketAddr> {
        self.endpoints.get(slot as usize).copied().flatten()
    }

    /// True when `slot` is occupied by exactly `addr`. Input and Leave
    /// are only honored when the sender passes this check.
    pub fn matches(&self, slot: u16, addr: SocketAddr) -> bool {
        self.endpoint(slot) == Some(addr)
    }

    pub fn slot_of(&self, addr: SocketAddr) -> Option<u16> {
        self.endpoints
            .iter()
            .position(|e| *e == Some(addr))
            .map(|slot| slot as u16)
    }

    pub fn iter_present(&self) -> impl Iterator<Item = (u16, SocketAddr)> + '_ {
        self.endpoints
            .iter()
            .enumerate()
            .filter_map(|(slot, e)| e.map(|addr| (slot as u16, addr)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn lowest_free_slot_first() {
        let mut table = SessionTable::new(4);
        assert_eq!(table.join(addr(1000)), Some(0));
        assert_eq!(table.join(addr(1001)), Some(1));
        assert_eq!(table.join(addr(1002)), Some(2));
        assert_eq!(table.player_count(), 3);
    }

    #[test]
    fn full_table_rejects_join() {
        let mut table = SessionTable::new(2);
        assert_eq!(table.join(addr(1000)), Some(0));
        assert_eq!(table.join(addr(1001)), Some(1));
        assert_eq!(table.join(addr(1002)), None);
        assert_eq!(table.player_count(), 2);
    }

    #[test]
    fn freed_slot_is_reused() {
        let mut table = SessionTable::new(2);
        assert_eq!(table.join(addr(1000)), Some(0));
        assert_eq!(table.join(addr(1001)), Some(1));

        table.leave(0);
        assert_eq!(table.join(addr(1002)), Some(0));
    }

    #[test]
    fn rejoin_returns_existing_slot() {
        let mut table = SessionTable::new(2);
        assert_eq!(table.join(addr(1000)), Some(0));
        assert_eq!(table.join(addr(1000)), Some(0));
        assert_eq!(table.player_count(), 1);
    }

    #[test]
    fn leave_is_idempotent() {
        let mut table = SessionTable::new(2);
        table.join(addr(1000));

        table.leave(0);
        table.leave(0);
        table.leave(1);
        table.leave(500);
        assert_eq!(table.player_count(), 0);
    }

    #[test]
    fn endpoint_match_check() {
        let mut table = SessionTable::new(2);
        table.join(addr(1000));

        assert!(table.matches(0, addr(1000)));
        assert!(!table.matches(0, addr(2000)));
        assert!(!table.matches(1, addr(1000)));
    }

    #[test]
    fn iter_present_skips_free_slots() {
        let mut table = SessionTable::new(4);
        table.join(addr(1000));
        table.join(addr(1001));
        table.join(addr(1002));
        table.leave(1);

        let present: Vec<(u16, SocketAddr)> = table.iter_present().collect();
        assert_eq!(present, vec![(0, addr(1000)), (2, addr(1002))]);
    }
}
