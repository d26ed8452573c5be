//! # Plankton Relay
//!
//! UDP relay for real-time multiplayer rooms.
//!
//! ## Architecture
//!
//! Clients log into a shared lobby, create or matchmake into rooms, and
//! exchange packets that the server forwards between room members:
//!
//! - **Lobby**: fixed table of sessions, keyed by slot id and token
//! - **Rooms**: fixed table of rooms with parameter-range matchmaking
//! - **Election**: one live master per room, handed over on silence
//! - **Relay**: unreliable fan-out, reliable unicast with server-side ack
//!   for empty seats, ack forwarding
//! - **Sweeper**: idle expiry and periodic re-election
//!
//! ## Trust model
//!
//! ```text
//! CLIENT                           SERVER
//!   |                                 |
//!   |--- token, slot, room, index --->|
//!   |                                 | <- all four must match one session
//!   |<-- frame / error / nothing -----|
//!   |                                 |
//! ```
//!
//! Garbage is dropped silently. Stale credentials get an `Expired` reply so
//! a legitimate client knows to log in again.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use plankton_relay::{RelayConfig, RelayServer, SystemClock, UdpTransport};
//!
//! let config = RelayConfig::default();
//! let transport = UdpTransport::bind(config.bind_address, Duration::from_millis(100))?;
//! let server = RelayServer::new(config, Arc::new(SystemClock::new()))?;
//! let handle = server.start(Arc::new(transport))?;
//! // ...
//! handle.stop();
//! ```

pub mod clock;
pub mod config;
pub mod console;
pub mod election;
pub mod error;
pub mod lobby;
pub mod matchmaking;
pub mod relay;
pub mod report;
pub mod rooms;
pub mod server;
pub mod sweeper;
pub mod transport;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RelayConfig;
pub use console::ConsoleCommand;
pub use error::{RelayError, RelayResult};
pub use lobby::{Lobby, Session};
pub use report::{RoomReport, ServerReport};
pub use rooms::{Room, RoomTable};
pub use server::{Dispatcher, RelayServer, ServerHandle, ServerState};
pub use sweeper::Sweeper;
pub use transport::{MemoryTransport, Transport, TransportSnapshot, UdpTransport};
pub use types::{RoomId, RoomIndex, Seat, SlotId};
