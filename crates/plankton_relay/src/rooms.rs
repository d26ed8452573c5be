//! # Room Table
//!
//! Fixed-capacity array of rooms, each a fixed array of member slots.
//!
//! ## Design
//!
//! - Rooms are never deleted: a room with no members is free for the next
//!   [`RoomTable::create_room`]
//! - Members are back-references by [`SlotId`]; the session side holds the
//!   matching [`Seat`]. Both halves are always written together
//! - A member's index is stable for as long as it stays in the room

use plankton_protocol::{MatchmakingParams, RoomProperties, MATCHMAKING_PARAMS, ROOM_PROPERTIES_LEN};

use crate::lobby::Session;
use crate::types::{RoomId, RoomIndex, Seat, SlotId};

/// A matchmaking room.
#[derive(Clone, Debug)]
pub struct Room {
    id: RoomId,
    member_count: usize,
    members: Box<[Option<SlotId>]>,
    open_since: Option<u64>,
    open_timeout_ms: u64,
    properties: RoomProperties,
    params: MatchmakingParams,
}

impl Room {
    fn new(id: RoomId, capacity: usize) -> Self {
        Self {
            id,
            member_count: 0,
            members: vec![None; capacity].into_boxed_slice(),
            open_since: None,
            open_timeout_ms: 0,
            properties: [0; ROOM_PROPERTIES_LEN],
            params: [0; MATCHMAKING_PARAMS],
        }
    }

    /// Room id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> RoomId {
        self.id
    }

    /// Number of occupied member slots.
    #[inline]
    #[must_use]
    pub const fn member_count(&self) -> usize {
        self.member_count
    }

    /// Number of member slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the room has no members and can be reused.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.member_count == 0
    }

    /// Returns true if no member slot is free.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.member_count >= self.members.len()
    }

    /// Member at `index`, if occupied.
    #[inline]
    #[must_use]
    pub fn member(&self, index: RoomIndex) -> Option<SlotId> {
        *self.members.get(index.as_usize())?
    }

    /// Occupied member slots in index order.
    pub fn members(&self) -> impl Iterator<Item = (RoomIndex, SlotId)> + '_ {
        self.members.iter().enumerate().filter_map(|(i, member)| {
            let index = RoomIndex(u8::try_from(i).ok()?);
            member.map(|slot| (index, slot))
        })
    }

    /// Application metadata set by the creator.
    #[inline]
    #[must_use]
    pub const fn properties(&self) -> &RoomProperties {
        &self.properties
    }

    /// Matchmaking parameters set by the creator.
    #[inline]
    #[must_use]
    pub const fn params(&self) -> &MatchmakingParams {
        &self.params
    }

    /// Clock reading at creation, `None` if never opened.
    #[inline]
    #[must_use]
    pub const fn open_since(&self) -> Option<u64> {
        self.open_since
    }

    /// Returns true if new members may still be matched in.
    ///
    /// A zero timeout keeps the room open for its whole life.
    #[must_use]
    pub fn is_open(&self, now: u64) -> bool {
        match self.open_since {
            None => false,
            Some(_) if self.open_timeout_ms == 0 => true,
            Some(since) => now.saturating_sub(since) <= self.open_timeout_ms,
        }
    }

    fn insert(&mut self, slot: SlotId) -> Option<RoomIndex> {
        let position = self.members.iter().position(Option::is_none)?;
        let index = RoomIndex(u8::try_from(position).ok()?);
        self.members[position] = Some(slot);
        self.member_count += 1;
        Some(index)
    }
}

/// The room table.
pub struct RoomTable {
    rooms: Box<[Room]>,
}

impl RoomTable {
    /// Creates `count` empty rooms with `capacity` member slots each.
    #[must_use]
    pub fn new(count: usize, capacity: usize) -> Self {
        let rooms: Vec<Room> = (0..count)
            .map_while(|i| u16::try_from(i).ok())
            .map(|i| Room::new(RoomId(i), capacity))
            .collect();
        Self {
            rooms: rooms.into_boxed_slice(),
        }
    }

    /// Number of rooms.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Returns true if the table has no rooms at all.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Room `id`, if in range.
    #[inline]
    #[must_use]
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id.as_usize())
    }

    /// Iterates over every room, empty ones included.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter()
    }

    /// Iterates over rooms with at least one member.
    pub fn active_rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter().filter(|room| !room.is_empty())
    }

    /// First room with no members.
    #[must_use]
    pub fn find_empty_room(&self) -> Option<RoomId> {
        self.rooms.iter().find(|room| room.is_empty()).map(Room::id)
    }

    /// Opens an empty room and seats `session` as its first member.
    ///
    /// Returns false if the session is already seated or every room is in use.
    pub fn create_room(
        &mut self,
        session: &mut Session,
        now: u64,
        open_timeout_ms: u64,
        properties: RoomProperties,
        params: MatchmakingParams,
    ) -> bool {
        if session.seat.is_some() {
            return false;
        }
        let Some(id) = self.find_empty_room() else {
            return false;
        };
        let room = &mut self.rooms[id.as_usize()];
        room.members.fill(None);
        room.open_since = Some(now);
        room.open_timeout_ms = open_timeout_ms;
        room.properties = properties;
        room.params = params;
        self.join_room(session, id)
    }

    /// Seats `session` in the first free member slot of room `id`.
    ///
    /// Returns false if the session is already seated, the id is out of
    /// range or the room is full.
    pub fn join_room(&mut self, session: &mut Session, id: RoomId) -> bool {
        if session.seat.is_some() {
            return false;
        }
        let Some(room) = self.rooms.get_mut(id.as_usize()) else {
            return false;
        };
        let Some(index) = room.insert(session.slot) else {
            return false;
        };
        session.seat = Some(Seat { room: id, index });
        true
    }

    /// Removes `session` from its room and clears its seat and master flag.
    ///
    /// A no-op for unseated sessions. The member slot is only cleared if it
    /// still refers to this session.
    pub fn leave_room(&mut self, session: &mut Session) {
        let Some(seat) = session.seat.take() else {
            return;
        };
        session.set_master(false);
        let Some(room) = self.rooms.get_mut(seat.room.as_usize()) else {
            return;
        };
        if let Some(member) = room.members.get_mut(seat.index.as_usize()) {
            if *member == Some(session.slot) {
                *member = None;
                room.member_count -= 1;
            }
        }
    }
}
