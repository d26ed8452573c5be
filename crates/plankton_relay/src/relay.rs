//! # Packet Relay
//!
//! Routing for the three relay packet kinds. The server keeps no state per
//! packet: it resolves recipients under the locks, copies their addresses
//! into a [`Recipients`] list, and sends after the locks are released.
//!
//! ## Routes
//!
//! ```text
//! Unreliable  target -1  → every member but the sender
//!             target -2  → every member
//!             target  n  → member n, if seated
//! Reliable    target  n  → member n, or an ack straight back if n is empty
//! Relied      target  n  → member n, if seated
//! ```

use std::net::SocketAddr;

use plankton_protocol::{MAX_ROOM_CAPACITY, TARGET_ALL, TARGET_OTHERS};

use crate::lobby::Lobby;
use crate::rooms::Room;
use crate::types::RoomIndex;

/// Addresses a relay frame goes to, copied out of the lobby.
#[derive(Clone, Copy, Debug)]
pub struct Recipients {
    addrs: [Option<SocketAddr>; MAX_ROOM_CAPACITY],
    len: usize,
}

impl Recipients {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            addrs: [None; MAX_ROOM_CAPACITY],
            len: 0,
        }
    }

    /// Adds an address. Ignored once the list holds a full room.
    #[inline]
    pub fn push(&mut self, addr: SocketAddr) {
        if let Some(entry) = self.addrs.get_mut(self.len) {
            *entry = Some(addr);
            self.len += 1;
        }
    }

    /// Number of addresses.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nobody should receive the frame.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over the addresses in member order.
    pub fn iter(&self) -> impl Iterator<Item = SocketAddr> + '_ {
        self.addrs[..self.len].iter().flatten().copied()
    }
}

impl Default for Recipients {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a reliable packet goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReliableRoute {
    /// Forward to the seated target.
    Forward(SocketAddr),
    /// Target seat is empty: acknowledge back to the sender.
    AckToSender,
}

/// Address of the member at `index`, if the seat is taken by a live session.
#[must_use]
pub fn member_addr(lobby: &Lobby, room: &Room, index: RoomIndex) -> Option<SocketAddr> {
    room.member(index)
        .and_then(|slot| lobby.get(slot))
        .map(|session| session.peer)
}

/// Recipients of an unreliable packet from `sender`.
///
/// Unknown negative targets and out-of-range indices route nowhere.
#[must_use]
pub fn unreliable_recipients(lobby: &Lobby, room: &Room, sender: RoomIndex, target: i8) -> Recipients {
    let mut recipients = Recipients::new();
    match target {
        TARGET_OTHERS | TARGET_ALL => {
            for (index, slot) in room.members() {
                if target == TARGET_OTHERS && index == sender {
                    continue;
                }
                if let Some(session) = lobby.get(slot) {
                    recipients.push(session.peer);
                }
            }
        }
        _ => {
            if let Some(addr) = RoomIndex::from_wire(target).and_then(|i| member_addr(lobby, room, i)) {
                recipients.push(addr);
            }
        }
    }
    recipients
}

/// Route of a reliable packet to `target`.
#[must_use]
pub fn reliable_route(lobby: &Lobby, room: &Room, target: RoomIndex) -> ReliableRoute {
    member_addr(lobby, room, target).map_or(ReliableRoute::AckToSender, ReliableRoute::Forward)
}

/// Destination of an ack for `target`, if that seat is taken.
#[must_use]
pub fn relied_recipient(lobby: &Lobby, room: &Room, target: RoomIndex) -> Option<SocketAddr> {
    member_addr(lobby, room, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::RoomTable;
    use crate::types::{RoomId, SlotId};
    use std::num::NonZeroU32;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    /// Room 0 with members at indices 0, 1, 2; index 1 then leaves.
    fn setup() -> (Lobby, RoomTable, Vec<SlotId>) {
        let mut lobby = Lobby::new(4);
        let mut rooms = RoomTable::new(1, 4);
        let mut slots = Vec::new();
        for i in 0..3u8 {
            let slot = lobby
                .allocate([i; 32], addr(8000 + u16::from(i)), NonZeroU32::new(u32::from(i) + 1).unwrap(), 0)
                .unwrap();
            let session = lobby.get_mut(slot).unwrap();
            if i == 0 {
                rooms.create_room(session, 0, 0, [0; 32], [0; 4]);
            } else {
                rooms.join_room(session, RoomId(0));
            }
            slots.push(slot);
        }
        rooms.leave_room(lobby.get_mut(slots[1]).unwrap());
        (lobby, rooms, slots)
    }

    fn collect(recipients: &Recipients) -> Vec<SocketAddr> {
        recipients.iter().collect()
    }

    #[test]
    fn test_broadcast_to_others_skips_sender() {
        let (lobby, rooms, _) = setup();
        let room = rooms.room(RoomId(0)).unwrap();
        let recipients = unreliable_recipients(&lobby, room, RoomIndex(0), TARGET_OTHERS);
        assert_eq!(collect(&recipients), vec![addr(8002)]);
    }

    #[test]
    fn test_broadcast_to_all_includes_sender() {
        let (lobby, rooms, _) = setup();
        let room = rooms.room(RoomId(0)).unwrap();
        let recipients = unreliable_recipients(&lobby, room, RoomIndex(0), TARGET_ALL);
        assert_eq!(collect(&recipients), vec![addr(8000), addr(8002)]);
    }

    #[test]
    fn test_unicast_to_empty_or_invalid_seat_goes_nowhere() {
        let (lobby, rooms, _) = setup();
        let room = rooms.room(RoomId(0)).unwrap();
        assert_eq!(collect(&unreliable_recipients(&lobby, room, RoomIndex(0), 2)), vec![addr(8002)]);
        assert!(unreliable_recipients(&lobby, room, RoomIndex(0), 1).is_empty());
        assert!(unreliable_recipients(&lobby, room, RoomIndex(0), 30).is_empty());
        assert!(unreliable_recipients(&lobby, room, RoomIndex(0), -7).is_empty());
    }

    #[test]
    fn test_reliable_to_empty_seat_acks_sender() {
        let (lobby, rooms, _) = setup();
        let room = rooms.room(RoomId(0)).unwrap();
        assert_eq!(reliable_route(&lobby, room, RoomIndex(1)), ReliableRoute::AckToSender);
        assert_eq!(reliable_route(&lobby, room, RoomIndex(2)), ReliableRoute::Forward(addr(8002)));
        assert_eq!(relied_recipient(&lobby, room, RoomIndex(1)), None);
        assert_eq!(relied_recipient(&lobby, room, RoomIndex(0)), Some(addr(8000)));
    }

    #[test]
    fn test_recipients_cap_at_room_capacity() {
        let mut recipients = Recipients::new();
        for port in 0..40 {
            recipients.push(addr(port));
        }
        assert_eq!(recipients.len(), MAX_ROOM_CAPACITY);
    }
}
