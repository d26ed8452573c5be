//! # Server State
//!
//! Everything the workers and the sweeper share.
//!
//! ## Locking
//!
//! ```text
//! tokens  ─ leaf: nothing is acquired while it is held
//! lobby   ─┐
//! rooms   ─┴ always lobby first, then rooms, via `World`
//! ```
//!
//! The room table has no accessor of its own: [`ServerState::world`] is the
//! only way to reach it, and it takes the lobby lock first. Nothing in the
//! crate can acquire the two in the opposite order.

use std::num::NonZeroU32;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::clock::Clock;
use crate::config::RelayConfig;
use crate::election;
use crate::lobby::{Lobby, Session};
use crate::rooms::RoomTable;
use crate::types::SlotId;

/// Monotonic session token generator.
#[derive(Debug)]
pub struct TokenIssuer {
    last: u32,
}

impl TokenIssuer {
    /// Creates an issuer whose first token is `seed + 1`.
    #[must_use]
    pub const fn starting_at(seed: u32) -> Self {
        Self { last: seed }
    }

    /// Issues the next token. Wraps around, skipping zero.
    pub fn issue(&mut self) -> NonZeroU32 {
        loop {
            self.last = self.last.wrapping_add(1);
            if let Some(token) = NonZeroU32::new(self.last) {
                return token;
            }
        }
    }
}

/// Shared server state.
pub struct ServerState {
    config: RelayConfig,
    tokens: Mutex<TokenIssuer>,
    lobby: Mutex<Lobby>,
    rooms: Mutex<RoomTable>,
    clock: Arc<dyn Clock>,
}

impl ServerState {
    /// Allocates every table from `config`.
    #[must_use]
    pub fn new(config: RelayConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens: Mutex::new(TokenIssuer::starting_at(config.initial_token)),
            lobby: Mutex::new(Lobby::new(config.lobby_capacity())),
            rooms: Mutex::new(RoomTable::new(config.room_count, config.room_capacity)),
            config,
            clock,
        }
    }

    /// Server configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Current clock reading.
    #[inline]
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Issues a fresh session token.
    #[must_use]
    pub fn issue_token(&self) -> NonZeroU32 {
        self.tokens.lock().issue()
    }

    /// Locks the lobby alone.
    pub fn lobby(&self) -> MutexGuard<'_, Lobby> {
        self.lobby.lock()
    }

    /// Locks the lobby, then the room table.
    pub fn world(&self) -> World<'_> {
        let lobby = self.lobby.lock();
        let rooms = self.rooms.lock();
        World { lobby, rooms }
    }
}

/// Both tables, locked in order.
pub struct World<'a> {
    lobby: MutexGuard<'a, Lobby>,
    rooms: MutexGuard<'a, RoomTable>,
}

impl World<'_> {
    /// The session directory.
    #[inline]
    #[must_use]
    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    /// The room table.
    #[inline]
    #[must_use]
    pub fn rooms(&self) -> &RoomTable {
        &self.rooms
    }

    /// Both tables, mutably.
    #[inline]
    pub fn split_mut(&mut self) -> (&mut Lobby, &mut RoomTable) {
        (&mut self.lobby, &mut self.rooms)
    }

    /// Detaches the session in `slot` from its room and frees the slot.
    ///
    /// Returns the removed session; `None` if the slot was already free.
    pub fn remove_session(&mut self, slot: SlotId) -> Option<Session> {
        let (lobby, rooms) = self.split_mut();
        rooms.leave_room(lobby.get_mut(slot)?);
        lobby.release(slot)
    }

    /// Removes every session idle for longer than `timeout_ms`.
    ///
    /// Returns the number of sessions removed.
    pub fn expire_idle(&mut self, now: u64, timeout_ms: u64) -> usize {
        let mut expired = 0;
        for position in 0..self.lobby.capacity() {
            let Ok(raw) = u16::try_from(position) else {
                break;
            };
            let slot = SlotId(raw);
            let idle = match self.lobby.get(slot) {
                Some(session) if session.idle_ms(now) > timeout_ms => session.idle_ms(now),
                _ => continue,
            };
            if let Some(session) = self.remove_session(slot) {
                tracing::info!(
                    "Session expired: slot {} token {} idle {}ms",
                    slot,
                    session.token,
                    idle
                );
                expired += 1;
            }
        }
        expired
    }

    /// Runs master election for every room with members.
    pub fn elect_all(&mut self, now: u64, master_timeout_ms: u64) -> usize {
        let (lobby, rooms) = self.split_mut();
        election::elect_all(lobby, rooms, now, master_timeout_ms)
    }
}
