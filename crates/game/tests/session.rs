use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use arena::{
    ClientMessage, InputFlags, NetworkEndpoint, PlayerVisual, ServerMessage, SessionTable,
    StateEntry, StateUpdate, MAX_DATAGRAM_SIZE,
};

fn bind_pair() -> (NetworkEndpoint, NetworkEndpoint) {
    let server = NetworkEndpoint::bind("127.0.0.1:0").unwrap();
    let mut client = NetworkEndpoint::bind("127.0.0.1:0").unwrap();
    client.set_remote(server.local_addr());
    (server, client)
}

fn send_client(endpoint: &mut NetworkEndpoint, msg: &ClientMessage) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    let len = msg.encode(&mut buf).unwrap();
    endpoint.send(&buf[..len]).unwrap();
}

fn send_server(endpoint: &mut NetworkEndpoint, msg: &ServerMessage, addr: SocketAddr) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    let len = msg.encode(&mut buf).unwrap();
    endpoint.send_to(&buf[..len], addr).unwrap();
}

/// Polls until one datagram arrives, returning the raw bytes.
fn wait_for_datagram(endpoint: &mut NetworkEndpoint, timeout_ms: u64) -> (Vec<u8>, SocketAddr) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        if let Some((len, addr)) = endpoint.receive(&mut buf).unwrap() {
            return (buf[..len].to_vec(), addr);
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("no datagram within {timeout_ms} ms");
}

#[test]
fn join_exchange_assigns_lowest_slot() {
    let (mut server, mut client) = bind_pair();
    let mut sessions = SessionTable::new(8);

    send_client(&mut client, &ClientMessage::Join);

    let (data, from) = wait_for_datagram(&mut server, 500);
    assert_eq!(ClientMessage::decode(&data).unwrap(), ClientMessage::Join);

    let slot = sessions.join(from).expect("table not full");
    assert_eq!(slot, 0);
    send_server(
        &mut server,
        &ServerMessage::JoinResult { slot: Some(slot) },
        from,
    );

    let (data, _) = wait_for_datagram(&mut client, 500);
    match ServerMessage::decode(&data).unwrap() {
        ServerMessage::JoinResult { slot } => assert_eq!(slot, Some(0)),
        other => panic!("expected JoinResult, got {other:?}"),
    }
}

#[test]
fn join_denied_when_table_full() {
    let (mut server, mut client) = bind_pair();
    let mut sessions = SessionTable::new(0);

    send_client(&mut client, &ClientMessage::Join);
    let (_, from) = wait_for_datagram(&mut server, 500);

    assert_eq!(sessions.join(from), None);
    send_server(&mut server, &ServerMessage::JoinResult { slot: None }, from);

    let (data, _) = wait_for_datagram(&mut client, 500);
    match ServerMessage::decode(&data).unwrap() {
        ServerMessage::JoinResult { slot } => assert_eq!(slot, None),
        other => panic!("expected JoinResult, got {other:?}"),
    }
}

#[test]
fn input_is_echoed_in_state_with_both_players() {
    let (mut server, mut first) = bind_pair();
    let mut second = NetworkEndpoint::bind("127.0.0.1:0").unwrap();
    second.set_remote(server.local_addr());

    let mut sessions = SessionTable::new(8);

    send_client(&mut first, &ClientMessage::Join);
    let (_, first_addr) = wait_for_datagram(&mut server, 500);
    let first_slot = sessions.join(first_addr).unwrap();

    send_client(&mut second, &ClientMessage::Join);
    let (_, second_addr) = wait_for_datagram(&mut server, 500);
    let second_slot = sessions.join(second_addr).unwrap();
    assert_eq!((first_slot, second_slot), (0, 1));

    send_client(
        &mut first,
        &ClientMessage::Input {
            slot: first_slot,
            flags: InputFlags::UP | InputFlags::LEFT,
            timestamp: 4_242,
            tick: 3,
        },
    );

    let (data, from) = wait_for_datagram(&mut server, 500);
    let (slot, flags, timestamp) = match ClientMessage::decode(&data).unwrap() {
        ClientMessage::Input {
            slot,
            flags,
            timestamp,
            ..
        } => (slot, flags, timestamp),
        other => panic!("expected Input, got {other:?}"),
    };
    assert!(sessions.matches(slot, from));
    assert_eq!(flags, InputFlags::UP | InputFlags::LEFT);

    // Reply with the sparse full-state snapshot the server loop builds.
    let players: Vec<StateEntry> = sessions
        .iter_present()
        .map(|(slot, _)| StateEntry {
            slot: slot as u8,
            visual: PlayerVisual {
                x: slot as f32 * 10.0,
                y: 0.0,
                facing: 0.0,
            },
        })
        .collect();
    send_server(
        &mut server,
        &ServerMessage::State(StateUpdate {
            tick: 4,
            timestamp_echo: timestamp,
            speed: 7.5,
            players,
        }),
        first_addr,
    );

    let (data, _) = wait_for_datagram(&mut first, 500);
    match ServerMessage::decode(&data).unwrap() {
        ServerMessage::State(state) => {
            assert_eq!(state.timestamp_echo, 4_242);
            assert_eq!(state.speed, 7.5);
            assert_eq!(state.players.len(), 2);
            assert_eq!(state.players[1].slot, 1);
            assert_eq!(state.players[1].visual.x, 10.0);
        }
        other => panic!("expected State, got {other:?}"),
    }
}

#[test]
fn malformed_datagram_does_not_affect_later_ones() {
    let (mut server, mut client) = bind_pair();

    client.send(&[0xEE, 1, 2, 3, 4]).unwrap();
    send_client(&mut client, &ClientMessage::Leave { slot: 2 });

    // First drained datagram fails to decode and is dropped.
    let (data, _) = wait_for_datagram(&mut server, 500);
    assert!(ClientMessage::decode(&data).is_err());
    server.record_malformed();

    // The next one in the same queue decodes cleanly.
    let (data, _) = wait_for_datagram(&mut server, 500);
    assert_eq!(
        ClientMessage::decode(&data).unwrap(),
        ClientMessage::Leave { slot: 2 }
    );
    assert_eq!(server.stats().malformed_dropped, 1);
}

#[test]
fn leave_then_rejoin_reuses_slot() {
    let (mut server, mut client) = bind_pair();
    let mut sessions = SessionTable::new(2);

    let other: SocketAddr = "127.0.0.1:9999".parse().unwrap();
    assert_eq!(sessions.join(other), Some(0));

    send_client(&mut client, &ClientMessage::Join);
    let (_, addr) = wait_for_datagram(&mut server, 500);
    assert_eq!(sessions.join(addr), Some(1));

    send_client(&mut client, &ClientMessage::Leave { slot: 1 });
    let (data, from) = wait_for_datagram(&mut server, 500);
    match ClientMessage::decode(&data).unwrap() {
        ClientMessage::Leave { slot } => {
            assert!(sessions.matches(slot, from));
            sessions.leave(slot);
        }
        other => panic!("expected Leave, got {other:?}"),
    }

    sessions.leave(0);
    // Lowest-free-first: the freed slot 0 goes to the next joiner.
    send_client(&mut client, &ClientMessage::Join);
    let (_, addr) = wait_for_datagram(&mut server, 500);
    assert_eq!(sessions.join(addr), Some(0));
}
