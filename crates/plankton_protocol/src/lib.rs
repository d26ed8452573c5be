//! # Plankton Protocol
//!
//! Wire format of the Plankton UDP relay.
//!
//! ## Overview
//!
//! Every datagram starts with a one-byte [`MessageType`] tag. Requests are
//! answered with a record of the same tag, or with a 2-byte
//! [`ErrorResponse`] when they are rejected.
//!
//! ```text
//! CLIENT                              SERVER
//!   |--- Login(device, checksum) ------->|
//!   |<-- LoginResponse(token, slot) -----|
//!   |--- Create / Join ----------------->|
//!   |<-- room, index, flags -------------|
//!   |--- PacketUnreliable(target) ------>|---> other members
//!   |--- PacketReliable(target, ack) --->|---> target
//!   |<-- PacketRelied(index, ack) -------|<--- target
//! ```
//!
//! ## Layout rules
//!
//! - All integers are little-endian, records are packed
//! - Login and logout records end with a [`checksum`]
//! - Relay packets declare their payload length; the payload is never parsed

pub mod checksum;
pub mod error;
pub mod packets;
pub mod serialization;

pub use error::{WireError, WireResult};
pub use packets::{
    Create, CreateResponse, Credentials, DeviceId, ErrorCode, ErrorResponse, Join, JoinResponse,
    Leave, Login, LoginResponse, Logout, MatchmakingParams, MatchmakingRanges, MessageType,
    PacketRelied, Ping, PingResponse, ReliableHeader, RoomProperties, UnreliableHeader,
    WireMessage, NO_INDEX, NO_ROOM, TARGET_ALL, TARGET_OTHERS,
};
pub use serialization::{PacketReader, PacketWriter};

/// Size of the receive buffer. Larger datagrams are truncated by the socket.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Length of the client device fingerprint.
pub const DEVICE_LEN: usize = 32;

/// Length of the opaque room properties blob.
pub const ROOM_PROPERTIES_LEN: usize = 32;

/// Number of matchmaking parameters per room.
pub const MATCHMAKING_PARAMS: usize = 4;

/// Number of bounds in a join request (a `[low, high]` pair per parameter).
pub const MATCHMAKING_RANGES: usize = MATCHMAKING_PARAMS * 2;

/// Largest room capacity the `i8` room index can address.
pub const MAX_ROOM_CAPACITY: usize = 32;

/// Session flag: the session is its room's master.
pub const FLAG_MASTER: u8 = 1;
