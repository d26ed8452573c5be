//! Randomized create/join/leave/expire sequences against the lobby and room
//! tables, checking seat symmetry after every step.

use std::net::SocketAddr;
use std::sync::Arc;

use plankton_relay::{ManualClock, RelayConfig, RoomId, ServerState, SlotId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ROOMS: usize = 6;
const CAPACITY: usize = 4;

fn state() -> (Arc<ManualClock>, ServerState) {
    let clock = Arc::new(ManualClock::new(1));
    let config = RelayConfig { room_count: ROOMS, room_capacity: CAPACITY, ..RelayConfig::default() };
    (clock.clone(), ServerState::new(config, clock))
}

fn assert_symmetric(state: &ServerState) {
    let world = state.world();
    let mut seated = 0;
    for room in world.rooms().rooms() {
        assert_eq!(room.member_count(), room.members().count());
        assert!(room.member_count() <= room.capacity());
        for (index, slot) in room.members() {
            let session = world.lobby().get(slot).expect("member slot must be live");
            let seat = session.seat.expect("member must be seated");
            assert_eq!(seat.room, room.id());
            assert_eq!(seat.index, index);
            seated += 1;
        }
    }
    for session in world.lobby().sessions() {
        if let Some(seat) = session.seat {
            let room = world.rooms().room(seat.room).unwrap();
            assert_eq!(room.member(seat.index), Some(session.slot));
        }
    }
    let lobby_seated = world.lobby().sessions().filter(|s| s.seat.is_some()).count();
    assert_eq!(seated, lobby_seated);
}

fn run_sequence(seed: u64) {
    let (clock, state) = state();
    let capacity = state.config().lobby_capacity();
    let addr = SocketAddr::from(([127, 0, 0, 1], 5000));
    let mut rng = StdRng::seed_from_u64(seed);

    for step in 0..2_000u32 {
        let now = state.now_ms();
        let slot = SlotId(rng.gen_range(0..capacity as u16));
        match rng.gen_range(0..6) {
            0 => {
                let mut device = [0u8; 32];
                device[..4].copy_from_slice(&step.to_le_bytes());
                let token = state.issue_token();
                let _ = state.lobby().allocate(device, addr, token, now);
            }
            1 => {
                let mut world = state.world();
                let (lobby, rooms) = world.split_mut();
                if let Some(session) = lobby.get_mut(slot) {
                    let params = [rng.gen_range(0..4), 0, 0, 0];
                    rooms.create_room(session, now, 0, [0; 32], params);
                }
            }
            2 => {
                let mut world = state.world();
                let (lobby, rooms) = world.split_mut();
                if let Some(session) = lobby.get_mut(slot) {
                    rooms.join_room(session, RoomId(rng.gen_range(0..ROOMS as u16 + 2)));
                }
            }
            3 => {
                let mut world = state.world();
                let (lobby, rooms) = world.split_mut();
                if let Some(session) = lobby.get_mut(slot) {
                    rooms.leave_room(session);
                }
            }
            4 => {
                state.world().remove_session(slot);
            }
            _ => {
                clock.advance(rng.gen_range(0..3_000));
                let now = state.now_ms();
                let mut world = state.world();
                world.expire_idle(now, 5_000);
                world.elect_all(now, 2_000);
            }
        }
        assert_symmetric(&state);
    }
}

#[test]
fn test_random_sequences_keep_seats_symmetric() {
    for seed in [1, 7, 42, 1_234, 99_999] {
        run_sequence(seed);
    }
}

#[test]
fn test_election_leaves_one_master_per_live_room() {
    let (clock, state) = state();
    let addr = SocketAddr::from(([127, 0, 0, 1], 5000));
    let mut rng = StdRng::seed_from_u64(3);

    for i in 0..(ROOMS * CAPACITY) as u8 {
        let slot = state.lobby().allocate([i; 32], addr, state.issue_token(), 1).unwrap();
        let mut world = state.world();
        let (lobby, rooms) = world.split_mut();
        let session = lobby.get_mut(slot).unwrap();
        if !rooms.join_room(session, RoomId(u16::from(i) % ROOMS as u16)) {
            rooms.create_room(session, 1, 0, [0; 32], [0; 4]);
        }
    }

    for _ in 0..50 {
        clock.advance(rng.gen_range(0..1_500));
        let now = state.now_ms();
        {
            let mut lobby = state.lobby();
            let slot = SlotId(rng.gen_range(0..(ROOMS * CAPACITY) as u16));
            lobby.touch(slot, addr, now);
        }
        let mut world = state.world();
        world.elect_all(now, 1_000);
        for room in world.rooms().active_rooms() {
            let sessions: Vec<_> = room.members().filter_map(|(_, slot)| world.lobby().get(slot)).collect();
            let masters = sessions.iter().filter(|s| s.is_master()).count();
            let any_live = sessions.iter().any(|s| s.idle_ms(now) < 1_000);
            assert_eq!(masters, usize::from(any_live), "room {} has {} masters", room.id(), masters);
        }
    }
}
