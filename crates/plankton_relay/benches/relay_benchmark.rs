//! # Relay Hot Path Benchmark
//!
//! Per-datagram cost of the dispatcher with the transport stubbed out.
//!
//! Run with: `cargo bench --package plankton_relay`

// Benchmarks don't need strict docs
#![allow(missing_docs)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use plankton_protocol::{
    checksum, Credentials, PacketWriter, Ping, UnreliableHeader, WireMessage, MAX_DATAGRAM_SIZE,
    TARGET_OTHERS,
};
use plankton_relay::{Dispatcher, ManualClock, MemoryTransport, RelayConfig, RoomId, ServerState};

fn peer(i: u16) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, 1], 20_000 + i))
}

/// One room with `members` seated sessions. Returns the first member's credentials.
fn seated_state(members: usize) -> (ServerState, Credentials) {
    let config = RelayConfig {
        room_count: 4,
        room_capacity: members.max(2),
        ..RelayConfig::default()
    };
    let state = ServerState::new(config, Arc::new(ManualClock::new(1_000)));
    let mut first = None;
    {
        let mut world = state.world();
        let (lobby, rooms) = world.split_mut();
        for i in 0..members {
            let slot = lobby
                .allocate([i as u8; 32], peer(i as u16), state.issue_token(), 1_000)
                .expect("lobby has room");
            let session = lobby.get_mut(slot).expect("just allocated");
            if i == 0 {
                rooms.create_room(session, 1_000, 0, [0; 32], [0; 4]);
                first = Some(session.credentials());
            } else {
                rooms.join_room(session, RoomId(0));
            }
        }
    }
    (state, first.expect("at least one member"))
}

fn bench_checksum(c: &mut Criterion) {
    let record = [0xA5u8; 64];
    c.bench_function("checksum_64_bytes", |b| {
        b.iter(|| black_box(checksum::compute(black_box(&record))));
    });
}

fn bench_ping(c: &mut Criterion) {
    let (state, credentials) = seated_state(2);
    let transport = MemoryTransport::new(peer(9_999), Duration::from_millis(1));
    let mut dispatcher = Dispatcher::new(&state, &transport);

    let mut w = PacketWriter::new();
    Ping { credentials, client_time: 42 }.encode(&mut w).expect("ping fits");
    let packet = w.as_slice().to_vec();
    let mut buffer = [0u8; MAX_DATAGRAM_SIZE];

    c.bench_function("dispatch_ping", |b| {
        b.iter(|| {
            buffer[..packet.len()].copy_from_slice(&packet);
            dispatcher.dispatch(&mut buffer[..packet.len()], peer(0));
            black_box(transport.take_sent());
        });
    });
}

fn bench_unreliable_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_unreliable_fanout");

    for members in [2usize, 8, 32] {
        let (state, credentials) = seated_state(members);
        let transport = MemoryTransport::new(peer(9_999), Duration::from_millis(1));
        let mut dispatcher = Dispatcher::new(&state, &transport);

        let mut w = PacketWriter::new();
        UnreliableHeader::encode(credentials, TARGET_OTHERS, &[7u8; 128], &mut w).expect("payload fits");
        let packet = w.as_slice().to_vec();
        let mut buffer = [0u8; MAX_DATAGRAM_SIZE];

        group.bench_with_input(BenchmarkId::from_parameter(members), &members, |b, _| {
            b.iter(|| {
                buffer[..packet.len()].copy_from_slice(&packet);
                dispatcher.dispatch(&mut buffer[..packet.len()], peer(0));
                black_box(transport.take_sent());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_checksum, bench_ping, bench_unreliable_fanout);
criterion_main!(benches);
