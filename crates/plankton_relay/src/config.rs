//! # Relay Configuration
//!
//! Server settings, loaded once at startup from an optional TOML file.
//!
//! ```toml
//! bind_address = "0.0.0.0:36000"
//! room_count = 1024
//! room_capacity = 16
//! session_timeout_ms = 300000
//! master_timeout_ms = 5000
//! ```
//!
//! Every key is optional. A missing file means "all defaults".

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::Path;

use plankton_protocol::MAX_ROOM_CAPACITY;
use serde::Deserialize;

use crate::error::{RelayError, RelayResult};

/// Default UDP port.
pub const DEFAULT_PORT: u16 = 36000;

/// Largest lobby the `i16` wire slot id can address.
pub const MAX_LOBBY_CAPACITY: usize = i16::MAX as usize;

/// Largest room table the `i16` wire room id can address.
pub const MAX_ROOM_COUNT: usize = i16::MAX as usize;

/// Relay server configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Address the UDP socket binds to.
    pub bind_address: SocketAddr,
    /// Number of rooms in the room table.
    pub room_count: usize,
    /// Members per room.
    pub room_capacity: usize,
    /// Session slots; defaults to `room_count * room_capacity`.
    pub lobby_capacity: Option<usize>,
    /// Idle time after which the sweeper expires a session.
    pub session_timeout_ms: u64,
    /// Idle time after which a master loses its flag.
    pub master_timeout_ms: u64,
    /// Sweeper cadence.
    pub sweep_interval_ms: u64,
    /// Election cadence; never faster than the sweep.
    pub election_interval_ms: u64,
    /// Receive workers sharing the socket.
    pub worker_threads: usize,
    /// How long a worker blocks on the socket before checking for shutdown.
    pub recv_timeout_ms: u64,
    /// Token counter seed; the first token issued is one above this.
    pub initial_token: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            room_count: 1024,
            room_capacity: 16,
            lobby_capacity: None,
            session_timeout_ms: 300_000,
            master_timeout_ms: 5_000,
            sweep_interval_ms: 1_000,
            election_interval_ms: 1_000,
            worker_threads: 31,
            recv_timeout_ms: 100,
            initial_token: 654_987,
        }
    }
}

impl RelayConfig {
    /// Parses a configuration from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// [`RelayError::ConfigParse`] for malformed TOML or unknown keys,
    /// [`RelayError::Config`] for out-of-range values.
    pub fn from_toml(text: &str) -> RelayResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file, falling back to defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Read failures other than "not found", plus everything
    /// [`RelayConfig::from_toml`] reports.
    pub fn load(path: &Path) -> RelayResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("Config file {} not found, using defaults", path.display());
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            Err(source) => Err(RelayError::ConfigRead {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Effective number of session slots.
    #[must_use]
    pub fn lobby_capacity(&self) -> usize {
        self.lobby_capacity
            .unwrap_or_else(|| self.room_count.saturating_mul(self.room_capacity))
    }

    /// Effective election cadence, clamped to at least the sweep interval.
    #[must_use]
    pub fn election_interval_ms(&self) -> u64 {
        self.election_interval_ms.max(self.sweep_interval_ms)
    }

    /// Checks every value is within what the tables and wire format can address.
    ///
    /// # Errors
    ///
    /// [`RelayError::Config`] naming the first offending key.
    pub fn validate(&self) -> RelayResult<()> {
        if self.room_count == 0 || self.room_count > MAX_ROOM_COUNT {
            return Err(RelayError::Config(format!(
                "room_count must be in 1..={MAX_ROOM_COUNT}, got {}",
                self.room_count
            )));
        }
        if self.room_capacity == 0 || self.room_capacity > MAX_ROOM_CAPACITY {
            return Err(RelayError::Config(format!(
                "room_capacity must be in 1..={MAX_ROOM_CAPACITY}, got {}",
                self.room_capacity
            )));
        }
        let lobby = self.lobby_capacity();
        if lobby == 0 || lobby > MAX_LOBBY_CAPACITY {
            return Err(RelayError::Config(format!(
                "lobby_capacity must be in 1..={MAX_LOBBY_CAPACITY}, got {lobby}"
            )));
        }
        if self.worker_threads == 0 {
            return Err(RelayError::Config("worker_threads must be at least 1".into()));
        }
        if self.sweep_interval_ms == 0 || self.recv_timeout_ms == 0 {
            return Err(RelayError::Config(
                "sweep_interval_ms and recv_timeout_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
