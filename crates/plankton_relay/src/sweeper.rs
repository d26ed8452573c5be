//! # Liveness Sweeper
//!
//! Background pass that expires idle sessions and re-runs master election,
//! so stale state heals even in rooms nobody is talking in.
//!
//! Each tick:
//!
//! 1. Every session idle longer than `session_timeout_ms` leaves its room
//!    and loses its slot
//! 2. If `election_interval_ms` has passed since the last election, every
//!    room with members re-elects its master

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::server::ServerState;

/// What one sweep did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Sessions removed for inactivity.
    pub expired: usize,
    /// Rooms that ran an election, zero if election was not due.
    pub elected_rooms: usize,
}

/// Periodic cleanup task.
pub struct Sweeper {
    state: Arc<ServerState>,
    last_election: Option<u64>,
}

impl Sweeper {
    /// Creates a sweeper over `state`.
    #[must_use]
    pub const fn new(state: Arc<ServerState>) -> Self {
        Self {
            state,
            last_election: None,
        }
    }

    /// Runs one sweep at the current clock reading.
    pub fn tick(&mut self) -> SweepOutcome {
        let config = self.state.config();
        let now = self.state.now_ms();
        let election_due = self
            .last_election
            .map_or(true, |last| now.saturating_sub(last) >= config.election_interval_ms());

        let mut world = self.state.world();
        let mut outcome = SweepOutcome {
            expired: world.expire_idle(now, config.session_timeout_ms),
            elected_rooms: 0,
        };
        if election_due {
            outcome.elected_rooms = world.elect_all(now, config.master_timeout_ms);
            self.last_election = Some(now);
        }
        outcome
    }

    /// Sweeps every `sweep_interval_ms` until `shutdown` fires or disconnects.
    pub fn run(mut self, shutdown: &Receiver<()>) {
        let interval = Duration::from_millis(self.state.config().sweep_interval_ms);
        tracing::info!("Sweeper started (interval: {:?})", interval);
        loop {
            match shutdown.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    let outcome = self.tick();
                    if outcome.expired > 0 {
                        tracing::info!("Sweep expired {} sessions", outcome.expired);
                    }
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::info!("Sweeper stopped");
    }
}
