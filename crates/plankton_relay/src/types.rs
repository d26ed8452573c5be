//! # Identifiers
//!
//! Integer ids addressing the lobby and room tables.
//!
//! On the wire these are signed and `-1` means "none". Inside the server
//! absence is always an `Option`, and an id that exists is always in range
//! for the table it was issued by.

use std::fmt;

use plankton_protocol::{NO_INDEX, NO_ROOM};

/// Stable index of a session in the lobby.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u16);

impl SlotId {
    /// Parses a wire slot id. Negative values are never valid.
    #[inline]
    #[must_use]
    pub fn from_wire(raw: i16) -> Option<Self> {
        u16::try_from(raw).ok().map(Self)
    }

    /// Wire representation. Lobby capacity is capped at `i16::MAX`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn to_wire(self) -> i16 {
        self.0 as i16
    }

    /// Position in the lobby table.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a room in the room table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(pub u16);

impl RoomId {
    /// Parses a wire room id; `-1` and other negatives map to `None`.
    #[inline]
    #[must_use]
    pub fn from_wire(raw: i16) -> Option<Self> {
        u16::try_from(raw).ok().map(Self)
    }

    /// Wire representation. Room count is capped at `i16::MAX`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn to_wire(self) -> i16 {
        self.0 as i16
    }

    /// Position in the room table.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a session within its room's member array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomIndex(pub u8);

impl RoomIndex {
    /// Parses a wire room index; negatives map to `None`.
    #[inline]
    #[must_use]
    pub fn from_wire(raw: i8) -> Option<Self> {
        u8::try_from(raw).ok().map(Self)
    }

    /// Wire representation. Room capacity is capped well below `i8::MAX`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn to_wire(self) -> i8 {
        self.0 as i8
    }

    /// Position in the member array.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Where a session sits: a room and its index inside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Seat {
    /// Room the session belongs to.
    pub room: RoomId,
    /// Index within the room.
    pub index: RoomIndex,
}

impl Seat {
    /// Parses a wire `(room, index)` pair.
    ///
    /// Returns `None` unless both halves are non-negative.
    #[must_use]
    pub fn from_wire(room: i16, index: i8) -> Option<Self> {
        Some(Self {
            room: RoomId::from_wire(room)?,
            index: RoomIndex::from_wire(index)?,
        })
    }

    /// Wire representation of an optional seat; `(-1, -1)` when unseated.
    #[must_use]
    pub fn to_wire(seat: Option<Self>) -> (i16, i8) {
        seat.map_or((NO_ROOM, NO_INDEX), |s| (s.room.to_wire(), s.index.to_wire()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_wire_ids_are_none() {
        assert_eq!(SlotId::from_wire(-1), None);
        assert_eq!(RoomId::from_wire(NO_ROOM), None);
        assert_eq!(RoomIndex::from_wire(NO_INDEX), None);
        assert_eq!(SlotId::from_wire(7), Some(SlotId(7)));
    }

    #[test]
    fn test_seat_wire_pair() {
        assert_eq!(Seat::to_wire(None), (-1, -1));
        let seat = Seat { room: RoomId(12), index: RoomIndex(3) };
        assert_eq!(Seat::to_wire(Some(seat)), (12, 3));
        assert_eq!(Seat::from_wire(12, 3), Some(seat));
        assert_eq!(Seat::from_wire(12, -1), None);
        assert_eq!(Seat::from_wire(-1, 3), None);
    }
}
