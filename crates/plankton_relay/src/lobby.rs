//! # Session Directory
//!
//! Fixed-capacity table of logged-in sessions, addressed by [`SlotId`].
//!
//! ## Design
//!
//! - All slots pre-allocated at startup, an empty slot is `None`
//! - A slot id is stable for the session's lifetime and reused only after
//!   [`Lobby::release`]
//! - Every lookup that authenticates a request compares the full token, so
//!   a stale client holding an old slot id is rejected, never confused
//!   with the slot's new owner

use std::net::SocketAddr;
use std::num::NonZeroU32;

use plankton_protocol::{Credentials, DeviceId, FLAG_MASTER};

use crate::types::{Seat, SlotId};

/// One logged-in client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// Slot the session occupies.
    pub slot: SlotId,
    /// Device fingerprint given at login.
    pub device: DeviceId,
    /// Secret proving control of the session.
    pub token: NonZeroU32,
    /// Last address a validated packet came from.
    pub peer: SocketAddr,
    /// Clock reading of the last validated packet.
    pub last_active: u64,
    /// Room membership, if any.
    pub seat: Option<Seat>,
    /// Flag bits, see [`FLAG_MASTER`].
    pub flags: u8,
}

impl Session {
    /// Returns true if the session is its room's master.
    #[inline]
    #[must_use]
    pub const fn is_master(&self) -> bool {
        self.flags & FLAG_MASTER != 0
    }

    /// Sets or clears the master flag.
    #[inline]
    pub fn set_master(&mut self, master: bool) {
        if master {
            self.flags |= FLAG_MASTER;
        } else {
            self.flags &= !FLAG_MASTER;
        }
    }

    /// Milliseconds since the last validated packet.
    #[inline]
    #[must_use]
    pub const fn idle_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_active)
    }

    /// The credentials a client holding this session would send.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        let (room, index) = Seat::to_wire(self.seat);
        Credentials {
            token: self.token.get(),
            slot: self.slot.to_wire(),
            room,
            index,
        }
    }
}

/// The session directory.
pub struct Lobby {
    slots: Box<[Option<Session>]>,
    live: usize,
}

impl Lobby {
    /// Creates an empty lobby with `capacity` slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity].into_boxed_slice(),
            live: 0,
        }
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live sessions.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.live
    }

    /// Returns true if no session is live.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns true if every slot is taken.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.live >= self.slots.len()
    }

    /// Session in `slot`, if live.
    #[inline]
    #[must_use]
    pub fn get(&self, slot: SlotId) -> Option<&Session> {
        self.slots.get(slot.as_usize())?.as_ref()
    }

    /// Mutable session in `slot`, if live.
    #[inline]
    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut Session> {
        self.slots.get_mut(slot.as_usize())?.as_mut()
    }

    /// Iterates over live sessions in slot order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.slots.iter().flatten()
    }

    /// Resolves a wire `(token, slot)` pair.
    ///
    /// Out-of-range slots and token mismatches both yield `None`.
    #[must_use]
    pub fn find_by_token(&self, token: u32, slot: i16) -> Option<&Session> {
        let session = self.get(SlotId::from_wire(slot)?)?;
        (session.token.get() == token).then_some(session)
    }

    /// Resolves full credentials: token, slot and the claimed seat must all
    /// match the stored session.
    #[must_use]
    pub fn find_by_token_and_room(&self, credentials: &Credentials) -> Option<&Session> {
        let session = self.find_by_token(credentials.token, credentials.slot)?;
        (Seat::to_wire(session.seat) == (credentials.room, credentials.index)).then_some(session)
    }

    /// Finds the slot of the session logged in from `device`.
    #[must_use]
    pub fn find_by_device(&self, device: &DeviceId) -> Option<SlotId> {
        self.sessions().find(|s| &s.device == device).map(|s| s.slot)
    }

    /// Places a new session in the first free slot.
    ///
    /// Returns `None` when the lobby is full.
    pub fn allocate(
        &mut self,
        device: DeviceId,
        peer: SocketAddr,
        token: NonZeroU32,
        now: u64,
    ) -> Option<SlotId> {
        let position = self.slots.iter().position(Option::is_none)?;
        let slot = SlotId(u16::try_from(position).ok()?);
        self.slots[position] = Some(Session {
            slot,
            device,
            token,
            peer,
            last_active: now,
            seat: None,
            flags: 0,
        });
        self.live += 1;
        Some(slot)
    }

    /// Frees `slot`, returning the session that held it.
    ///
    /// Releasing a free slot is a no-op. The caller must have detached the
    /// session from its room first.
    pub fn release(&mut self, slot: SlotId) -> Option<Session> {
        let session = self.slots.get_mut(slot.as_usize())?.take()?;
        self.live -= 1;
        Some(session)
    }

    /// Records a validated packet from `slot`.
    pub fn touch(&mut self, slot: SlotId, peer: SocketAddr, now: u64) {
        if let Some(session) = self.get_mut(slot) {
            session.peer = peer;
            session.last_active = now;
        }
    }
}
