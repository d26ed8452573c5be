//! # Matchmaking
//!
//! First-fit search for an open room whose parameters fall inside the
//! requester's ranges.
//!
//! A joiner sends one inclusive `[low, high]` pair per room parameter:
//!
//! ```text
//! ranges:  [ lo0, hi0, lo1, hi1, lo2, hi2, lo3, hi3 ]
//! params:  [  p0,       p1,       p2,       p3      ]
//! match  ⇔ lo_i <= p_i <= hi_i  for every i
//! ```
//!
//! There is no scoring: the lowest-numbered qualifying room wins.

use plankton_protocol::{MatchmakingParams, MatchmakingRanges};

use crate::lobby::Session;
use crate::rooms::{Room, RoomTable};
use crate::types::RoomId;

/// Returns true if every parameter lies inside its requested range.
///
/// An inverted pair (`low > high`) matches nothing.
#[must_use]
pub fn params_in_ranges(params: &MatchmakingParams, ranges: &MatchmakingRanges) -> bool {
    params
        .iter()
        .zip(ranges.chunks_exact(2))
        .all(|(&value, range)| range[0] <= value && value <= range[1])
}

/// Returns true if `room` can take a matchmade joiner right now.
#[must_use]
pub fn is_joinable(room: &Room, ranges: &MatchmakingRanges, now: u64) -> bool {
    !room.is_empty() && !room.is_full() && room.is_open(now) && params_in_ranges(room.params(), ranges)
}

impl RoomTable {
    /// First room that has members, has space, is open and matches `ranges`.
    #[must_use]
    pub fn find_compatible_room(&self, ranges: &MatchmakingRanges, now: u64) -> Option<RoomId> {
        self.rooms()
            .find(|room| is_joinable(room, ranges, now))
            .map(Room::id)
    }

    /// Finds a compatible room and seats `session` in it.
    ///
    /// Returns the joined room, or `None` if nothing matched or the session
    /// is already seated.
    pub fn matchmake(
        &mut self,
        session: &mut Session,
        ranges: &MatchmakingRanges,
        now: u64,
    ) -> Option<RoomId> {
        if session.seat.is_some() {
            return None;
        }
        let id = self.find_compatible_room(ranges, now)?;
        self.join_room(session, id).then_some(id)
    }
}
