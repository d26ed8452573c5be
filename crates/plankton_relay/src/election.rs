//! # Master Election
//!
//! Each room has at most one master: the member the clients treat as the
//! authority for game state.
//!
//! ## Rules
//!
//! 1. A master whose last packet is younger than the timeout keeps the flag
//! 2. Otherwise the flag is cleared, and the lowest-index member that is
//!    still live takes it
//! 3. If no member is live the room stays masterless until the next run
//!
//! Election runs on the sweeper's cadence and synchronously after every
//! create and join, so the response already carries the new flags.

use crate::lobby::Lobby;
use crate::rooms::{Room, RoomTable};
use crate::types::SlotId;

/// Re-evaluates the master of `room`. Returns the master after the run.
pub fn elect_master(lobby: &mut Lobby, room: &Room, now: u64, master_timeout_ms: u64) -> Option<SlotId> {
    let is_live = |lobby: &Lobby, slot: SlotId| {
        lobby
            .get(slot)
            .is_some_and(|s| s.idle_ms(now) < master_timeout_ms)
    };

    let mut current = None;
    for (_, slot) in room.members() {
        let Some(session) = lobby.get_mut(slot) else {
            continue;
        };
        if session.is_master() {
            if current.is_none() {
                current = Some(slot);
            } else {
                session.set_master(false);
            }
        }
    }

    if let Some(master) = current {
        if is_live(lobby, master) {
            return Some(master);
        }
        if let Some(session) = lobby.get_mut(master) {
            session.set_master(false);
        }
    }

    let successor = room.members().map(|(_, slot)| slot).find(|&slot| is_live(lobby, slot))?;
    if let Some(session) = lobby.get_mut(successor) {
        session.set_master(true);
    }
    if current != Some(successor) {
        tracing::debug!("Room {} master is now slot {}", room.id(), successor);
    }
    Some(successor)
}

/// Runs [`elect_master`] for every room with members.
///
/// Returns the number of rooms visited.
pub fn elect_all(lobby: &mut Lobby, rooms: &RoomTable, now: u64, master_timeout_ms: u64) -> usize {
    let mut visited = 0;
    for room in rooms.active_rooms() {
        elect_master(lobby, room, now, master_timeout_ms);
        visited += 1;
    }
    visited
}
