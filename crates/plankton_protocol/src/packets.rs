//! # Packet Definitions
//!
//! Every record of the relay protocol. All records are packed, little-endian
//! and fixed-size except the relay packets, which carry a payload whose
//! length is declared in the header.
//!
//! ## Credentials
//!
//! Most client requests carry the same 9-byte credential block:
//!
//! ```text
//! ┌──────────┬─────────┬─────────┬─────────┐
//! │ token u32│ slot i16│ room i16│ index i8│
//! └──────────┴─────────┴─────────┴─────────┘
//! ```
//!
//! `room == -1 && index == -1` means the session is not seated in a room.

use crate::checksum;
use crate::error::{WireError, WireResult};
use crate::serialization::{PacketReader, PacketWriter};
use crate::{DEVICE_LEN, MATCHMAKING_PARAMS, MATCHMAKING_RANGES, ROOM_PROPERTIES_LEN};

/// Wire value of "not seated" for the room id.
pub const NO_ROOM: i16 = -1;

/// Wire value of "not seated" for the room index.
pub const NO_INDEX: i8 = -1;

/// Relay target: every member except the sender.
pub const TARGET_OTHERS: i8 = -1;

/// Relay target: every member including the sender.
pub const TARGET_ALL: i8 = -2;

/// Device fingerprint supplied by the client at login.
pub type DeviceId = [u8; DEVICE_LEN];

/// Application-defined room metadata.
pub type RoomProperties = [u8; ROOM_PROPERTIES_LEN];

/// Room characteristics used by matchmaking.
pub type MatchmakingParams = [i32; MATCHMAKING_PARAMS];

/// Inclusive `[low, high]` pairs, one per matchmaking parameter.
pub type MatchmakingRanges = [i32; MATCHMAKING_RANGES];

/// Leading type tag of every datagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Bidirectional: keep-alive with time echo.
    Ping = 1,
    /// Client -> Server: authenticate a device.
    Login = 2,
    /// Client -> Server: end the session.
    Logout = 3,
    /// Client -> Server: open a new room.
    Create = 4,
    /// Client -> Server: matchmake into an open room.
    Join = 5,
    /// Client -> Server: leave the current room.
    Leave = 6,
    /// Relayed application payload, no acknowledgment.
    PacketUnreliable = 10,
    /// Relayed application payload with ack number.
    PacketReliable = 11,
    /// Acknowledgment of a reliable payload.
    PacketRelied = 12,
}

impl TryFrom<u8> for MessageType {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Ping),
            2 => Ok(Self::Login),
            3 => Ok(Self::Logout),
            4 => Ok(Self::Create),
            5 => Ok(Self::Join),
            6 => Ok(Self::Leave),
            10 => Ok(Self::PacketUnreliable),
            11 => Ok(Self::PacketReliable),
            12 => Ok(Self::PacketRelied),
            other => Err(WireError::UnknownType(other)),
        }
    }
}

impl MessageType {
    /// Reads the type tag of a datagram without decoding the rest.
    ///
    /// # Errors
    ///
    /// [`WireError::Truncated`] for an empty datagram,
    /// [`WireError::UnknownType`] for an unknown tag.
    pub fn peek(datagram: &[u8]) -> WireResult<Self> {
        let tag = *datagram.first().ok_or(WireError::Truncated {
            needed: 1,
            remaining: 0,
        })?;
        Self::try_from(tag)
    }
}

/// Result code carried by every response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(i8)]
pub enum ErrorCode {
    /// Request succeeded.
    #[default]
    None = 0,
    /// Credentials did not resolve to a live session; log in again.
    Expired = 1,
    /// Lobby or room table exhausted.
    IsFull = 2,
    /// No compatible open room.
    Matchmake = 3,
}

impl TryFrom<i8> for ErrorCode {
    type Error = WireError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Expired),
            2 => Ok(Self::IsFull),
            3 => Ok(Self::Matchmake),
            other => Err(WireError::UnknownErrorCode(other)),
        }
    }
}

/// Session credentials carried by most requests.
///
/// Size: 9 bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Credentials {
    /// Session token issued at login.
    pub token: u32,
    /// Lobby slot id.
    pub slot: i16,
    /// Room id, or [`NO_ROOM`].
    pub room: i16,
    /// Index within the room, or [`NO_INDEX`].
    pub index: i8,
}

impl Credentials {
    /// Size in bytes.
    pub const SIZE: usize = 9;

    /// Credentials of a session that is not seated in a room.
    #[must_use]
    pub const fn unseated(token: u32, slot: i16) -> Self {
        Self {
            token,
            slot,
            room: NO_ROOM,
            index: NO_INDEX,
        }
    }

    fn write(&self, w: &mut PacketWriter) -> WireResult<()> {
        w.write_u32(self.token)?;
        w.write_i16(self.slot)?;
        w.write_i16(self.room)?;
        w.write_i8(self.index)
    }

    fn read(r: &mut PacketReader<'_>) -> WireResult<Self> {
        Ok(Self {
            token: r.read_u32()?,
            slot: r.read_i16()?,
            room: r.read_i16()?,
            index: r.read_i8()?,
        })
    }
}

/// A fixed-size record with a known type tag.
///
/// `SIZE` covers the whole record: type tag, body and, when `CHECKSUMMED`,
/// the trailing checksum.
pub trait WireMessage: Sized {
    /// Leading type tag.
    const TYPE: MessageType;
    /// Total encoded size.
    const SIZE: usize;
    /// Whether the record ends with a checksum over all preceding bytes.
    const CHECKSUMMED: bool = false;

    /// Writes the fields between the type tag and the checksum.
    ///
    /// # Errors
    ///
    /// [`WireError::BufferFull`] if the writer is exhausted.
    fn write_body(&self, w: &mut PacketWriter) -> WireResult<()>;

    /// Reads the fields between the type tag and the checksum.
    ///
    /// # Errors
    ///
    /// [`WireError::Truncated`] if the datagram is short.
    fn read_body(r: &mut PacketReader<'_>) -> WireResult<Self>;

    /// Encodes the full record into `w`, replacing its contents.
    ///
    /// # Errors
    ///
    /// [`WireError::BufferFull`] if the writer is exhausted.
    fn encode(&self, w: &mut PacketWriter) -> WireResult<()> {
        w.reset();
        w.write_u8(Self::TYPE as u8)?;
        self.write_body(w)?;
        if Self::CHECKSUMMED {
            w.write_checksum()?;
        }
        Ok(())
    }

    /// Decodes a full record, verifying the tag and, if present, the checksum.
    ///
    /// Bytes past `SIZE` are ignored.
    ///
    /// # Errors
    ///
    /// Any [`WireError`] describing why the datagram is unusable.
    fn decode(datagram: &[u8]) -> WireResult<Self> {
        if datagram.len() < Self::SIZE {
            return Err(WireError::Truncated {
                needed: Self::SIZE,
                remaining: datagram.len(),
            });
        }
        let record = &datagram[..Self::SIZE];
        if record[0] != Self::TYPE as u8 {
            return Err(WireError::UnexpectedType {
                expected: Self::TYPE as u8,
                actual: record[0],
            });
        }
        if Self::CHECKSUMMED {
            checksum::verify(record)?;
        }
        let mut reader = PacketReader::new(&record[1..]);
        Self::read_body(&mut reader)
    }
}

fn read_error_code(r: &mut PacketReader<'_>) -> WireResult<ErrorCode> {
    ErrorCode::try_from(r.read_i8()?)
}

/// Keep-alive request - Client -> Server.
///
/// Size: 18 bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ping {
    /// Sender credentials.
    pub credentials: Credentials,
    /// Client clock in milliseconds, echoed back.
    pub client_time: u64,
}

impl WireMessage for Ping {
    const TYPE: MessageType = MessageType::Ping;
    const SIZE: usize = 18;

    fn write_body(&self, w: &mut PacketWriter) -> WireResult<()> {
        self.credentials.write(w)?;
        w.write_u64(self.client_time)
    }

    fn read_body(r: &mut PacketReader<'_>) -> WireResult<Self> {
        Ok(Self {
            credentials: Credentials::read(r)?,
            client_time: r.read_u64()?,
        })
    }
}

/// Keep-alive response - Server -> Client.
///
/// Size: 19 bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PingResponse {
    /// Result code.
    pub error: ErrorCode,
    /// Echo of the request's client time.
    pub client_time: u64,
    /// Server clock in milliseconds.
    pub server_time: u64,
    /// Session flags (bit 0: room master).
    pub flags: u8,
}

impl WireMessage for PingResponse {
    const TYPE: MessageType = MessageType::Ping;
    const SIZE: usize = 19;

    fn write_body(&self, w: &mut PacketWriter) -> WireResult<()> {
        w.write_i8(self.error as i8)?;
        w.write_u64(self.client_time)?;
        w.write_u64(self.server_time)?;
        w.write_u8(self.flags)
    }

    fn read_body(r: &mut PacketReader<'_>) -> WireResult<Self> {
        Ok(Self {
            error: read_error_code(r)?,
            client_time: r.read_u64()?,
            server_time: r.read_u64()?,
            flags: r.read_u8()?,
        })
    }
}

/// Login request - Client -> Server.
///
/// Size: 37 bytes (checksummed)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Login {
    /// Device fingerprint.
    pub device: DeviceId,
}

impl WireMessage for Login {
    const TYPE: MessageType = MessageType::Login;
    const SIZE: usize = 37;
    const CHECKSUMMED: bool = true;

    fn write_body(&self, w: &mut PacketWriter) -> WireResult<()> {
        w.write_pod(&self.device)
    }

    fn read_body(r: &mut PacketReader<'_>) -> WireResult<Self> {
        Ok(Self { device: r.read_pod()? })
    }
}

/// Login response - Server -> Client.
///
/// Size: 15 bytes (checksummed)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoginResponse {
    /// Result code.
    pub error: ErrorCode,
    /// Session token.
    pub token: u32,
    /// Lobby slot id.
    pub slot: i16,
    /// Current room, or [`NO_ROOM`].
    pub room: i16,
    /// Current room index, or [`NO_INDEX`].
    pub index: i8,
}

impl WireMessage for LoginResponse {
    const TYPE: MessageType = MessageType::Login;
    const SIZE: usize = 15;
    const CHECKSUMMED: bool = true;

    fn write_body(&self, w: &mut PacketWriter) -> WireResult<()> {
        w.write_i8(self.error as i8)?;
        w.write_u32(self.token)?;
        w.write_i16(self.slot)?;
        w.write_i16(self.room)?;
        w.write_i8(self.index)
    }

    fn read_body(r: &mut PacketReader<'_>) -> WireResult<Self> {
        Ok(Self {
            error: read_error_code(r)?,
            token: r.read_u32()?,
            slot: r.read_i16()?,
            room: r.read_i16()?,
            index: r.read_i8()?,
        })
    }
}

/// Logout request - Client -> Server.
///
/// Size: 14 bytes (checksummed)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Logout {
    /// Sender credentials.
    pub credentials: Credentials,
}

impl WireMessage for Logout {
    const TYPE: MessageType = MessageType::Logout;
    const SIZE: usize = 14;
    const CHECKSUMMED: bool = true;

    fn write_body(&self, w: &mut PacketWriter) -> WireResult<()> {
        self.credentials.write(w)
    }

    fn read_body(r: &mut PacketReader<'_>) -> WireResult<Self> {
        Ok(Self {
            credentials: Credentials::read(r)?,
        })
    }
}

/// Room creation request - Client -> Server.
///
/// Size: 57 bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Create {
    /// Session token.
    pub token: u32,
    /// Lobby slot id.
    pub slot: i16,
    /// Seconds the room stays matchable; 0 keeps it open forever.
    pub open_timeout_secs: u16,
    /// Room metadata handed to joiners.
    pub properties: RoomProperties,
    /// Room characteristics for matchmaking.
    pub params: MatchmakingParams,
}

impl WireMessage for Create {
    const TYPE: MessageType = MessageType::Create;
    const SIZE: usize = 57;

    fn write_body(&self, w: &mut PacketWriter) -> WireResult<()> {
        w.write_u32(self.token)?;
        w.write_i16(self.slot)?;
        w.write_u16(self.open_timeout_secs)?;
        w.write_pod(&self.properties)?;
        for param in self.params {
            w.write_i32(param)?;
        }
        Ok(())
    }

    fn read_body(r: &mut PacketReader<'_>) -> WireResult<Self> {
        let token = r.read_u32()?;
        let slot = r.read_i16()?;
        let open_timeout_secs = r.read_u16()?;
        let properties = r.read_pod()?;
        let mut params = [0i32; MATCHMAKING_PARAMS];
        for param in &mut params {
            *param = r.read_i32()?;
        }
        Ok(Self {
            token,
            slot,
            open_timeout_secs,
            properties,
            params,
        })
    }
}

/// Room creation response - Server -> Client.
///
/// Size: 6 bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreateResponse {
    /// Result code.
    pub error: ErrorCode,
    /// Room id of the new room.
    pub room: i16,
    /// Creator's index in the room.
    pub index: i8,
    /// Session flags after election.
    pub flags: u8,
}

impl WireMessage for CreateResponse {
    const TYPE: MessageType = MessageType::Create;
    const SIZE: usize = 6;

    fn write_body(&self, w: &mut PacketWriter) -> WireResult<()> {
        w.write_i8(self.error as i8)?;
        w.write_i16(self.room)?;
        w.write_i8(self.index)?;
        w.write_u8(self.flags)
    }

    fn read_body(r: &mut PacketReader<'_>) -> WireResult<Self> {
        Ok(Self {
            error: read_error_code(r)?,
            room: r.read_i16()?,
            index: r.read_i8()?,
            flags: r.read_u8()?,
        })
    }
}

/// Matchmaking join request - Client -> Server.
///
/// Size: 39 bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Join {
    /// Session token.
    pub token: u32,
    /// Lobby slot id.
    pub slot: i16,
    /// Accepted `[low, high]` range per room parameter.
    pub ranges: MatchmakingRanges,
}

impl WireMessage for Join {
    const TYPE: MessageType = MessageType::Join;
    const SIZE: usize = 39;

    fn write_body(&self, w: &mut PacketWriter) -> WireResult<()> {
        w.write_u32(self.token)?;
        w.write_i16(self.slot)?;
        for bound in self.ranges {
            w.write_i32(bound)?;
        }
        Ok(())
    }

    fn read_body(r: &mut PacketReader<'_>) -> WireResult<Self> {
        let token = r.read_u32()?;
        let slot = r.read_i16()?;
        let mut ranges = [0i32; MATCHMAKING_RANGES];
        for bound in &mut ranges {
            *bound = r.read_i32()?;
        }
        Ok(Self { token, slot, ranges })
    }
}

/// Matchmaking join response - Server -> Client.
///
/// Size: 38 bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JoinResponse {
    /// Result code.
    pub error: ErrorCode,
    /// Joined room id.
    pub room: i16,
    /// Joiner's index in the room.
    pub index: i8,
    /// Session flags after election.
    pub flags: u8,
    /// The room's properties blob.
    pub properties: RoomProperties,
}

impl WireMessage for JoinResponse {
    const TYPE: MessageType = MessageType::Join;
    const SIZE: usize = 38;

    fn write_body(&self, w: &mut PacketWriter) -> WireResult<()> {
        w.write_i8(self.error as i8)?;
        w.write_i16(self.room)?;
        w.write_i8(self.index)?;
        w.write_u8(self.flags)?;
        w.write_pod(&self.properties)
    }

    fn read_body(r: &mut PacketReader<'_>) -> WireResult<Self> {
        Ok(Self {
            error: read_error_code(r)?,
            room: r.read_i16()?,
            index: r.read_i8()?,
            flags: r.read_u8()?,
            properties: r.read_pod()?,
        })
    }
}

/// Leave-room request - Client -> Server.
///
/// Size: 10 bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Leave {
    /// Sender credentials.
    pub credentials: Credentials,
}

impl WireMessage for Leave {
    const TYPE: MessageType = MessageType::Leave;
    const SIZE: usize = 10;

    fn write_body(&self, w: &mut PacketWriter) -> WireResult<()> {
        self.credentials.write(w)
    }

    fn read_body(r: &mut PacketReader<'_>) -> WireResult<Self> {
        Ok(Self {
            credentials: Credentials::read(r)?,
        })
    }
}

/// Ack record of the reliable handshake.
///
/// Size: 12 bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketRelied {
    /// Sender credentials.
    pub credentials: Credentials,
    /// Room index of the original sender.
    pub target: i8,
    /// Ack number being confirmed.
    pub ack: u8,
}

impl PacketRelied {
    /// Size of the ack frame the server forwards.
    pub const FRAME_SIZE: usize = 3;

    /// Writes the 3-byte ack frame `[RELIED, index, ack]` over the start of
    /// `buffer` and returns it.
    ///
    /// `index` is the room index the receiver should attribute the ack to.
    ///
    /// # Panics
    ///
    /// Never for buffers that held a decoded relay packet, which are always
    /// longer than the frame.
    pub fn write_frame(buffer: &mut [u8], index: i8, ack: u8) -> &[u8] {
        buffer[0] = MessageType::PacketRelied as u8;
        buffer[1] = index.to_le_bytes()[0];
        buffer[2] = ack;
        &buffer[..Self::FRAME_SIZE]
    }
}

impl WireMessage for PacketRelied {
    const TYPE: MessageType = MessageType::PacketRelied;
    const SIZE: usize = 12;

    fn write_body(&self, w: &mut PacketWriter) -> WireResult<()> {
        self.credentials.write(w)?;
        w.write_i8(self.target)?;
        w.write_u8(self.ack)
    }

    fn read_body(r: &mut PacketReader<'_>) -> WireResult<Self> {
        Ok(Self {
            credentials: Credentials::read(r)?,
            target: r.read_i8()?,
            ack: r.read_u8()?,
        })
    }
}

/// Bare error reply - Server -> Client.
///
/// Carries the type of the request it answers.
///
/// Size: 2 bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Type of the rejected request.
    pub request: MessageType,
    /// Why it was rejected.
    pub error: ErrorCode,
}

impl ErrorResponse {
    /// Size in bytes.
    pub const SIZE: usize = 2;

    /// Encodes the reply into `w`, replacing its contents.
    ///
    /// # Errors
    ///
    /// [`WireError::BufferFull`] if the writer is exhausted.
    pub fn encode(&self, w: &mut PacketWriter) -> WireResult<()> {
        w.reset();
        w.write_u8(self.request as u8)?;
        w.write_i8(self.error as i8)
    }

    /// Decodes an error reply.
    ///
    /// # Errors
    ///
    /// Any [`WireError`] describing why the datagram is unusable.
    pub fn decode(datagram: &[u8]) -> WireResult<Self> {
        let mut r = PacketReader::new(datagram);
        let request = MessageType::try_from(r.read_u8()?)?;
        let error = read_error_code(&mut r)?;
        Ok(Self { request, error })
    }
}

/// Header of an unreliable relay packet - Client -> Server.
///
/// ```text
/// type │ credentials (9) │ target i8 │ datasize u8 │ payload…
/// ```
///
/// Size: 12 bytes + payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnreliableHeader {
    /// Sender credentials.
    pub credentials: Credentials,
    /// Member index, [`TARGET_OTHERS`] or [`TARGET_ALL`].
    pub target: i8,
    /// Payload length in bytes.
    pub datasize: u8,
}

impl UnreliableHeader {
    /// Header size in bytes.
    pub const SIZE: usize = 12;

    /// Offset of the 3-byte header of the forwarded frame.
    const FRAME_OFFSET: usize = Self::SIZE - 3;

    /// Decodes the header and checks the payload is fully present.
    ///
    /// # Errors
    ///
    /// [`WireError::Truncated`] or [`WireError::PayloadOverrun`] for short
    /// datagrams, [`WireError::UnexpectedType`] for a wrong tag.
    pub fn decode(datagram: &[u8]) -> WireResult<Self> {
        let mut r = PacketReader::new(datagram);
        expect_type(&mut r, MessageType::PacketUnreliable)?;
        let header = Self {
            credentials: Credentials::read(&mut r)?,
            target: r.read_i8()?,
            datasize: r.read_u8()?,
        };
        check_payload(usize::from(header.datasize), r.remaining())?;
        Ok(header)
    }

    /// Rewrites the datagram in place into the forwarded frame
    /// `[type, sender, datasize, payload…]` and returns it.
    ///
    /// The payload is not moved or copied.
    #[must_use]
    pub fn relay_frame(self, datagram: &mut [u8], sender: i8) -> &[u8] {
        let start = Self::FRAME_OFFSET;
        let end = Self::SIZE + usize::from(self.datasize);
        datagram[start] = MessageType::PacketUnreliable as u8;
        datagram[start + 1] = sender.to_le_bytes()[0];
        &datagram[start..end]
    }

    /// Encodes a full client packet. Used by clients and tests.
    ///
    /// # Errors
    ///
    /// [`WireError::BufferFull`] if the payload does not fit,
    /// [`WireError::PayloadOverrun`] if it exceeds 255 bytes.
    pub fn encode(
        credentials: Credentials,
        target: i8,
        payload: &[u8],
        w: &mut PacketWriter,
    ) -> WireResult<()> {
        let datasize = payload_len(payload)?;
        w.reset();
        w.write_u8(MessageType::PacketUnreliable as u8)?;
        credentials.write(w)?;
        w.write_i8(target)?;
        w.write_u8(datasize)?;
        w.write_bytes(payload)
    }
}

/// Header of a reliable relay packet - Client -> Server.
///
/// ```text
/// type │ credentials (9) │ target i8 │ ack u8 │ datasize u8 │ payload…
/// ```
///
/// Size: 13 bytes + payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReliableHeader {
    /// Sender credentials.
    pub credentials: Credentials,
    /// Member index of the receiver.
    pub target: i8,
    /// Ack number the receiver must echo.
    pub ack: u8,
    /// Payload length in bytes.
    pub datasize: u8,
}

impl ReliableHeader {
    /// Header size in bytes.
    pub const SIZE: usize = 13;

    /// Offset of the 4-byte header of the forwarded frame.
    const FRAME_OFFSET: usize = Self::SIZE - 4;

    /// Decodes the header and checks the payload is fully present.
    ///
    /// # Errors
    ///
    /// [`WireError::Truncated`] or [`WireError::PayloadOverrun`] for short
    /// datagrams, [`WireError::UnexpectedType`] for a wrong tag.
    pub fn decode(datagram: &[u8]) -> WireResult<Self> {
        let mut r = PacketReader::new(datagram);
        expect_type(&mut r, MessageType::PacketReliable)?;
        let header = Self {
            credentials: Credentials::read(&mut r)?,
            target: r.read_i8()?,
            ack: r.read_u8()?,
            datasize: r.read_u8()?,
        };
        check_payload(usize::from(header.datasize), r.remaining())?;
        Ok(header)
    }

    /// Rewrites the datagram in place into the forwarded frame
    /// `[type, sender, ack, datasize, payload…]` and returns it.
    #[must_use]
    pub fn relay_frame(self, datagram: &mut [u8], sender: i8) -> &[u8] {
        let start = Self::FRAME_OFFSET;
        let end = Self::SIZE + usize::from(self.datasize);
        datagram[start] = MessageType::PacketReliable as u8;
        datagram[start + 1] = sender.to_le_bytes()[0];
        datagram[start + 2] = self.ack;
        &datagram[start..end]
    }

    /// Encodes a full client packet. Used by clients and tests.
    ///
    /// # Errors
    ///
    /// [`WireError::BufferFull`] if the payload does not fit,
    /// [`WireError::PayloadOverrun`] if it exceeds 255 bytes.
    pub fn encode(
        credentials: Credentials,
        target: i8,
        ack: u8,
        payload: &[u8],
        w: &mut PacketWriter,
    ) -> WireResult<()> {
        let datasize = payload_len(payload)?;
        w.reset();
        w.write_u8(MessageType::PacketReliable as u8)?;
        credentials.write(w)?;
        w.write_i8(target)?;
        w.write_u8(ack)?;
        w.write_u8(datasize)?;
        w.write_bytes(payload)
    }
}

fn expect_type(r: &mut PacketReader<'_>, expected: MessageType) -> WireResult<()> {
    let actual = r.read_u8()?;
    if actual == expected as u8 {
        Ok(())
    } else {
        Err(WireError::UnexpectedType {
            expected: expected as u8,
            actual,
        })
    }
}

fn check_payload(declared: usize, available: usize) -> WireResult<()> {
    if declared > available {
        Err(WireError::PayloadOverrun { declared, available })
    } else {
        Ok(())
    }
}

fn payload_len(payload: &[u8]) -> WireResult<u8> {
    u8::try_from(payload.len()).map_err(|_| WireError::PayloadOverrun {
        declared: payload.len(),
        available: usize::from(u8::MAX),
    })
}
