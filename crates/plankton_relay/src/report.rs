//! # Reports
//!
//! Point-in-time summaries for the operator console. Built under the
//! locks, printed after they are released.

use std::fmt;

use crate::lobby::Session;
use crate::server::ServerState;
use crate::transport::{Transport, TransportSnapshot};
use crate::types::{RoomId, RoomIndex, SlotId};

/// Lobby, room table and transport totals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerReport {
    /// Live sessions.
    pub sessions: usize,
    /// Session slots.
    pub lobby_capacity: usize,
    /// Rooms with members, with their member counts.
    pub rooms: Vec<(RoomId, usize)>,
    /// Sessions seated in a room.
    pub seated: usize,
    /// Transport counters.
    pub traffic: TransportSnapshot,
}

impl ServerReport {
    /// Captures the current totals.
    #[must_use]
    pub fn capture(state: &ServerState, transport: &dyn Transport) -> Self {
        let traffic = transport.traffic();
        let world = state.world();
        let rooms: Vec<(RoomId, usize)> = world
            .rooms()
            .active_rooms()
            .map(|room| (room.id(), room.member_count()))
            .collect();
        Self {
            sessions: world.lobby().len(),
            lobby_capacity: world.lobby().capacity(),
            seated: rooms.iter().map(|(_, count)| count).sum(),
            rooms,
            traffic,
        }
    }
}

impl fmt::Display for ServerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sessions connected: {}/{}", self.sessions, self.lobby_capacity)?;
        for (room, count) in &self.rooms {
            writeln!(f, "Room[{room}] -> {count} members")?;
        }
        writeln!(f, "Active rooms: {}", self.rooms.len())?;
        writeln!(f, "Sessions in rooms: {}", self.seated)?;
        write!(f, "{}", self.traffic)
    }
}

/// One member line of a [`RoomReport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberReport {
    /// Index in the room.
    pub index: RoomIndex,
    /// Lobby slot.
    pub slot: SlotId,
    /// Session token.
    pub token: u32,
    /// Flag bits.
    pub flags: u8,
    /// Milliseconds since the last packet.
    pub idle_ms: u64,
    /// Device fingerprint, hex encoded.
    pub device: String,
}

impl MemberReport {
    fn new(index: RoomIndex, session: &Session, now: u64) -> Self {
        Self {
            index,
            slot: session.slot,
            token: session.token.get(),
            flags: session.flags,
            idle_ms: session.idle_ms(now),
            device: session.device.iter().map(|b| format!("{b:02x}")).collect(),
        }
    }
}

/// Members of one room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomReport {
    /// Room id.
    pub room: RoomId,
    /// Occupied member slots.
    pub member_count: usize,
    /// Member slots.
    pub capacity: usize,
    /// Whether matchmaking may still place joiners.
    pub open: bool,
    /// Occupied seats in index order.
    pub members: Vec<MemberReport>,
}

impl RoomReport {
    /// Captures room `id`, or `None` if it is out of range.
    #[must_use]
    pub fn capture(state: &ServerState, id: RoomId) -> Option<Self> {
        let now = state.now_ms();
        let world = state.world();
        let room = world.rooms().room(id)?;
        let members = room
            .members()
            .filter_map(|(index, slot)| {
                world
                    .lobby()
                    .get(slot)
                    .map(|session| MemberReport::new(index, session, now))
            })
            .collect();
        Some(Self {
            room: id,
            member_count: room.member_count(),
            capacity: room.capacity(),
            open: room.is_open(now),
            members,
        })
    }
}

impl fmt::Display for RoomReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Room[{}] {}/{} members{}",
            self.room,
            self.member_count,
            self.capacity,
            if self.open { " (open)" } else { "" }
        )?;
        for m in &self.members {
            write!(
                f,
                "\n  [{}] slot {} token {} flags {} idle {}ms device {}",
                m.index.0, m.slot, m.token, m.flags, m.idle_ms, m.device
            )?;
        }
        Ok(())
    }
}
