use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub enum ServerEvent {
    PlayerJoined { slot: u16, addr: SocketAddr },
    PlayerLeft { slot: u16, addr: SocketAddr },
    JoinDenied { addr: SocketAddr },
    Error { message: String },
}
