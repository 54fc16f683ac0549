#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub datagrams_sent: u64,
    pub datagrams_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// Datagrams the owning loop classified as malformed and dropped.
    pub malformed_dropped: u64,
}
