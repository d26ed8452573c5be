//! # Request Dispatch
//!
//! Decodes one datagram, runs its handler and sends whatever it produces.
//!
//! ## Design
//!
//! - Handlers return `Result<(), Rejection>`; only the dispatcher decides
//!   whether a rejection is answered or dropped
//! - State is touched under the locks; sends happen after every guard is
//!   released, from addresses copied out while locked
//! - Relay frames are rewritten in the receive buffer and sent from there

use std::net::SocketAddr;

use plankton_protocol::{
    Create, CreateResponse, Credentials, ErrorCode, ErrorResponse, Join, JoinResponse, Leave,
    Login, LoginResponse, Logout, MessageType, PacketRelied, PacketWriter, Ping, PingResponse,
    ReliableHeader, UnreliableHeader, WireError, WireMessage,
};

use super::state::ServerState;
use crate::election;
use crate::lobby::Lobby;
use crate::relay::{self, ReliableRoute};
use crate::transport::Transport;
use crate::types::{RoomIndex, Seat, SlotId};

/// Why a request produced no regular response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// Malformed, corrupt or out of range: no reply at all.
    Drop,
    /// Answer with an [`ErrorResponse`] carrying this code.
    Reply(ErrorCode),
}

impl From<WireError> for Rejection {
    fn from(_: WireError) -> Self {
        Self::Drop
    }
}

const EXPIRED: Rejection = Rejection::Reply(ErrorCode::Expired);

type HandlerResult = Result<(), Rejection>;

/// Per-worker request handler.
pub struct Dispatcher<'a> {
    state: &'a ServerState,
    transport: &'a dyn Transport,
    writer: PacketWriter,
}

impl<'a> Dispatcher<'a> {
    /// Creates a dispatcher sending through `transport`.
    #[must_use]
    pub fn new(state: &'a ServerState, transport: &'a dyn Transport) -> Self {
        Self {
            state,
            transport,
            writer: PacketWriter::new(),
        }
    }

    /// Handles one datagram received from `peer`.
    ///
    /// Relay packets are rewritten in place, so `datagram` is clobbered.
    pub fn dispatch(&mut self, datagram: &mut [u8], peer: SocketAddr) {
        let kind = match MessageType::peek(datagram) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::debug!("Dropped datagram from {}: {}", peer, e);
                return;
            }
        };

        let result = match kind {
            MessageType::Ping => self.handle_ping(datagram, peer),
            MessageType::Login => self.handle_login(datagram, peer),
            MessageType::Logout => self.handle_logout(datagram, peer),
            MessageType::Create => self.handle_create(datagram, peer),
            MessageType::Join => self.handle_join(datagram, peer),
            MessageType::Leave => self.handle_leave(datagram, peer),
            MessageType::PacketUnreliable => self.relay_unreliable(datagram, peer),
            MessageType::PacketReliable => self.relay_reliable(datagram, peer),
            MessageType::PacketRelied => self.relay_relied(datagram, peer),
        };

        match result {
            Ok(()) => {}
            Err(Rejection::Drop) => {
                tracing::debug!("Dropped {:?} from {}", kind, peer);
            }
            Err(Rejection::Reply(error)) => {
                tracing::debug!("Rejected {:?} from {}: {:?}", kind, peer, error);
                self.reply_status(kind, error, peer);
            }
        }
    }

    fn send(&self, frame: &[u8], peer: SocketAddr) {
        if let Err(e) = self.transport.send_to(frame, peer) {
            tracing::warn!("Send to {} failed: {}", peer, e);
        }
    }

    fn reply<M: WireMessage>(&mut self, message: &M, peer: SocketAddr) -> HandlerResult {
        message.encode(&mut self.writer)?;
        self.send(self.writer.as_slice(), peer);
        Ok(())
    }

    fn reply_status(&mut self, request: MessageType, error: ErrorCode, peer: SocketAddr) {
        match (ErrorResponse { request, error }).encode(&mut self.writer) {
            Ok(()) => self.send(self.writer.as_slice(), peer),
            Err(e) => tracing::warn!("Cannot encode {:?} status for {}: {}", request, peer, e),
        }
    }

    /// Resolves full credentials and records the packet's activity.
    fn authenticate(
        lobby: &mut Lobby,
        credentials: &Credentials,
        peer: SocketAddr,
        now: u64,
    ) -> Result<SlotId, Rejection> {
        let slot = lobby
            .find_by_token_and_room(credentials)
            .map(|session| session.slot)
            .ok_or(EXPIRED)?;
        lobby.touch(slot, peer, now);
        Ok(slot)
    }

    /// Resolves `(token, slot)` only and records the packet's activity.
    fn authenticate_token(
        lobby: &mut Lobby,
        token: u32,
        slot: i16,
        peer: SocketAddr,
        now: u64,
    ) -> Result<SlotId, Rejection> {
        let slot = lobby
            .find_by_token(token, slot)
            .map(|session| session.slot)
            .ok_or(EXPIRED)?;
        lobby.touch(slot, peer, now);
        Ok(slot)
    }

    /// Seat claimed by a relay packet; out of range means the packet is garbage.
    fn relay_seat(&self, credentials: &Credentials) -> Result<Seat, Rejection> {
        let config = self.state.config();
        Seat::from_wire(credentials.room, credentials.index)
            .filter(|seat| {
                seat.room.as_usize() < config.room_count
                    && seat.index.as_usize() < config.room_capacity
            })
            .ok_or(Rejection::Drop)
    }

    fn relay_target(&self, target: i8) -> Result<RoomIndex, Rejection> {
        RoomIndex::from_wire(target)
            .filter(|index| index.as_usize() < self.state.config().room_capacity)
            .ok_or(Rejection::Drop)
    }

    fn handle_ping(&mut self, datagram: &[u8], peer: SocketAddr) -> HandlerResult {
        let ping = Ping::decode(datagram)?;
        let now = self.state.now_ms();
        let flags = {
            let mut lobby = self.state.lobby();
            let slot = Self::authenticate(&mut lobby, &ping.credentials, peer, now)?;
            lobby.get(slot).map_or(0, |session| session.flags)
        };
        self.reply(
            &PingResponse {
                error: ErrorCode::None,
                client_time: ping.client_time,
                server_time: now,
                flags,
            },
            peer,
        )
    }

    fn handle_login(&mut self, datagram: &[u8], peer: SocketAddr) -> HandlerResult {
        let login = Login::decode(datagram)?;
        let now = self.state.now_ms();
        let response = {
            let mut lobby = self.state.lobby();
            let slot = if let Some(slot) = lobby.find_by_device(&login.device) {
                lobby.touch(slot, peer, now);
                tracing::info!("Session resumed: {} (slot: {})", peer, slot);
                slot
            } else {
                if lobby.is_full() {
                    tracing::warn!("Lobby full, login from {} refused", peer);
                    return Err(Rejection::Reply(ErrorCode::IsFull));
                }
                let token = self.state.issue_token();
                let slot = lobby
                    .allocate(login.device, peer, token, now)
                    .ok_or(Rejection::Reply(ErrorCode::IsFull))?;
                tracing::info!("Session opened: {} (slot: {})", peer, slot);
                slot
            };
            let session = lobby.get(slot).ok_or(Rejection::Drop)?;
            let credentials = session.credentials();
            LoginResponse {
                error: ErrorCode::None,
                token: credentials.token,
                slot: credentials.slot,
                room: credentials.room,
                index: credentials.index,
            }
        };
        self.reply(&response, peer)
    }

    fn handle_logout(&mut self, datagram: &[u8], peer: SocketAddr) -> HandlerResult {
        let logout = Logout::decode(datagram)?;
        SlotId::from_wire(logout.credentials.slot)
            .filter(|slot| slot.as_usize() < self.state.config().lobby_capacity())
            .ok_or(Rejection::Drop)?;
        let slot = {
            let mut world = self.state.world();
            let slot = world
                .lobby()
                .find_by_token_and_room(&logout.credentials)
                .map(|session| session.slot)
                .ok_or(EXPIRED)?;
            world.remove_session(slot);
            slot
        };
        tracing::info!("Session closed: {} (slot: {})", peer, slot);
        self.reply_status(MessageType::Logout, ErrorCode::None, peer);
        Ok(())
    }

    fn handle_create(&mut self, datagram: &[u8], peer: SocketAddr) -> HandlerResult {
        let create = Create::decode(datagram)?;
        let now = self.state.now_ms();
        let master_timeout = self.state.config().master_timeout_ms;
        let response = {
            let mut world = self.state.world();
            let (lobby, rooms) = world.split_mut();
            let slot = Self::authenticate_token(lobby, create.token, create.slot, peer, now)?;
            let session = lobby.get_mut(slot).ok_or(Rejection::Drop)?;
            if session.seat.is_none() {
                let open_timeout_ms = u64::from(create.open_timeout_secs) * 1000;
                if !rooms.create_room(session, now, open_timeout_ms, create.properties, create.params) {
                    tracing::warn!("No empty room for slot {}", slot);
                    return Err(Rejection::Reply(ErrorCode::IsFull));
                }
                if let Some(seat) = session.seat {
                    tracing::info!("Room {} created by slot {}", seat.room, slot);
                }
            }
            let seat = session.seat.ok_or(Rejection::Reply(ErrorCode::IsFull))?;
            let room = rooms.room(seat.room).ok_or(Rejection::Drop)?;
            election::elect_master(lobby, room, now, master_timeout);
            CreateResponse {
                error: ErrorCode::None,
                room: seat.room.to_wire(),
                index: seat.index.to_wire(),
                flags: lobby.get(slot).map_or(0, |s| s.flags),
            }
        };
        self.reply(&response, peer)
    }

    fn handle_join(&mut self, datagram: &[u8], peer: SocketAddr) -> HandlerResult {
        let join = Join::decode(datagram)?;
        let now = self.state.now_ms();
        let master_timeout = self.state.config().master_timeout_ms;
        let response = {
            let mut world = self.state.world();
            let (lobby, rooms) = world.split_mut();
            let slot = Self::authenticate_token(lobby, join.token, join.slot, peer, now)?;
            let session = lobby.get_mut(slot).ok_or(Rejection::Drop)?;
            if session.seat.is_none() && rooms.matchmake(session, &join.ranges, now).is_none() {
                return Err(Rejection::Reply(ErrorCode::Matchmake));
            }
            let seat = session.seat.ok_or(Rejection::Reply(ErrorCode::Matchmake))?;
            let room = rooms.room(seat.room).ok_or(Rejection::Drop)?;
            election::elect_master(lobby, room, now, master_timeout);
            tracing::info!("Slot {} joined room {} at index {}", slot, seat.room, seat.index.0);
            JoinResponse {
                error: ErrorCode::None,
                room: seat.room.to_wire(),
                index: seat.index.to_wire(),
                flags: lobby.get(slot).map_or(0, |s| s.flags),
                properties: *room.properties(),
            }
        };
        self.reply(&response, peer)
    }

    fn handle_leave(&mut self, datagram: &[u8], peer: SocketAddr) -> HandlerResult {
        let leave = Leave::decode(datagram)?;
        let now = self.state.now_ms();
        {
            let mut world = self.state.world();
            let (lobby, rooms) = world.split_mut();
            let slot = Self::authenticate(lobby, &leave.credentials, peer, now)?;
            if let Some(session) = lobby.get_mut(slot) {
                rooms.leave_room(session);
            }
        }
        self.reply_status(MessageType::Leave, ErrorCode::None, peer);
        Ok(())
    }

    fn relay_unreliable(&mut self, datagram: &mut [u8], peer: SocketAddr) -> HandlerResult {
        let header = UnreliableHeader::decode(datagram)?;
        let seat = self.relay_seat(&header.credentials)?;
        let now = self.state.now_ms();
        let recipients = {
            let mut world = self.state.world();
            let (lobby, rooms) = world.split_mut();
            Self::authenticate(lobby, &header.credentials, peer, now)?;
            let room = rooms.room(seat.room).ok_or(Rejection::Drop)?;
            relay::unreliable_recipients(lobby, room, seat.index, header.target)
        };
        if recipients.is_empty() {
            return Ok(());
        }
        let frame = header.relay_frame(datagram, header.credentials.index);
        for addr in recipients.iter() {
            self.send(frame, addr);
        }
        Ok(())
    }

    fn relay_reliable(&mut self, datagram: &mut [u8], peer: SocketAddr) -> HandlerResult {
        let header = ReliableHeader::decode(datagram)?;
        let seat = self.relay_seat(&header.credentials)?;
        let target = self.relay_target(header.target)?;
        let now = self.state.now_ms();
        let route = {
            let mut world = self.state.world();
            let (lobby, rooms) = world.split_mut();
            Self::authenticate(lobby, &header.credentials, peer, now)?;
            let room = rooms.room(seat.room).ok_or(Rejection::Drop)?;
            relay::reliable_route(lobby, room, target)
        };
        match route {
            ReliableRoute::Forward(addr) => {
                let frame = header.relay_frame(datagram, header.credentials.index);
                self.send(frame, addr);
            }
            ReliableRoute::AckToSender => {
                let frame = PacketRelied::write_frame(datagram, header.target, header.ack);
                self.send(frame, peer);
            }
        }
        Ok(())
    }

    fn relay_relied(&mut self, datagram: &mut [u8], peer: SocketAddr) -> HandlerResult {
        let relied = PacketRelied::decode(datagram)?;
        let seat = self.relay_seat(&relied.credentials)?;
        let target = self.relay_target(relied.target)?;
        let now = self.state.now_ms();
        let destination = {
            let mut world = self.state.world();
            let (lobby, rooms) = world.split_mut();
            Self::authenticate(lobby, &relied.credentials, peer, now)?;
            let room = rooms.room(seat.room).ok_or(Rejection::Drop)?;
            relay::relied_recipient(lobby, room, target)
        };
        if let Some(addr) = destination {
            let frame = PacketRelied::write_frame(datagram, relied.credentials.index, relied.ack);
            self.send(frame, addr);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::RelayConfig;
    use crate::transport::MemoryTransport;
    use crate::types::RoomId;
    use plankton_protocol::{
        DeviceId, MatchmakingRanges, FLAG_MASTER, NO_INDEX, NO_ROOM, TARGET_ALL, TARGET_OTHERS,
    };
    use std::sync::Arc;
    use std::time::Duration;

    const ANY: MatchmakingRanges = [i32::MIN, i32::MAX, i32::MIN, i32::MAX, i32::MIN, i32::MAX, i32::MIN, i32::MAX];

    struct Harness {
        clock: Arc<ManualClock>,
        state: ServerState,
        transport: MemoryTransport,
    }

    impl Harness {
        fn new(config: RelayConfig) -> Self {
            let clock = Arc::new(ManualClock::new(1_000));
            Self {
                state: ServerState::new(config, clock.clone()),
                clock,
                transport: MemoryTransport::new(addr(36000), Duration::from_millis(1)),
            }
        }

        fn small() -> Self {
            Self::new(RelayConfig {
                room_count: 2,
                room_capacity: 3,
                ..RelayConfig::default()
            })
        }

        fn send_raw(&self, bytes: &[u8], from: SocketAddr) -> Vec<(SocketAddr, Vec<u8>)> {
            let mut buffer = bytes.to_vec();
            Dispatcher::new(&self.state, &self.transport).dispatch(&mut buffer, from);
            self.transport.take_sent()
        }

        fn send<M: WireMessage>(&self, message: &M, from: SocketAddr) -> Vec<(SocketAddr, Vec<u8>)> {
            let mut w = PacketWriter::new();
            message.encode(&mut w).unwrap();
            self.send_raw(w.as_slice(), from)
        }

        fn login(&self, device: DeviceId, from: SocketAddr) -> Credentials {
            let sent = self.send(&Login { device }, from);
            assert_eq!(sent.len(), 1);
            let response = LoginResponse::decode(&sent[0].1).unwrap();
            assert_eq!(response.error, ErrorCode::None);
            Credentials {
                token: response.token,
                slot: response.slot,
                room: response.room,
                index: response.index,
            }
        }

        fn create(&self, creds: Credentials, from: SocketAddr, params: [i32; 4]) -> Credentials {
            let sent = self.send(
                &Create {
                    token: creds.token,
                    slot: creds.slot,
                    open_timeout_secs: 0,
                    properties: [0xAA; 32],
                    params,
                },
                from,
            );
            let response = CreateResponse::decode(&sent[0].1).unwrap();
            Credentials { room: response.room, index: response.index, ..creds }
        }

        fn join(&self, creds: Credentials, from: SocketAddr) -> Credentials {
            let sent = self.send(&Join { token: creds.token, slot: creds.slot, ranges: ANY }, from);
            let response = JoinResponse::decode(&sent[0].1).unwrap();
            Credentials { room: response.room, index: response.index, ..creds }
        }
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn error_of(sent: &[(SocketAddr, Vec<u8>)]) -> ErrorResponse {
        assert_eq!(sent.len(), 1);
        ErrorResponse::decode(&sent[0].1).unwrap()
    }

    #[test]
    fn test_login_issues_tokens_after_seed() {
        let h = Harness::small();
        let a = h.login([1; 32], addr(1));
        let b = h.login([2; 32], addr(2));
        assert_eq!(a.token, 654_988);
        assert_eq!(b.token, 654_989);
        assert_eq!((a.slot, b.slot), (0, 1));
        assert_eq!((a.room, a.index), (NO_ROOM, NO_INDEX));
    }

    #[test]
    fn test_relogin_same_device_reuses_slot_and_token() {
        let h = Harness::small();
        let first = h.login([7; 32], addr(1));
        let second = h.login([7; 32], addr(2));
        assert_eq!(first, second);
        assert_eq!(h.state.lobby().len(), 1);
        let lobby = h.state.lobby();
        let session = lobby.find_by_token(first.token, first.slot).unwrap();
        assert_eq!(session.peer, addr(2));
    }

    #[test]
    fn test_login_with_bad_checksum_is_dropped() {
        let h = Harness::small();
        let mut w = PacketWriter::new();
        Login { device: [1; 32] }.encode(&mut w).unwrap();
        let mut bytes = w.as_slice().to_vec();
        bytes[36] ^= 1;
        assert!(h.send_raw(&bytes, addr(1)).is_empty());
        assert!(h.state.lobby().is_empty());
    }

    #[test]
    fn test_login_when_full_is_refused() {
        let h = Harness::new(RelayConfig {
            room_count: 1,
            room_capacity: 1,
            ..RelayConfig::default()
        });
        h.login([1; 32], addr(1));
        let error = error_of(&h.send(&Login { device: [2; 32] }, addr(2)));
        assert_eq!(error, ErrorResponse { request: MessageType::Login, error: ErrorCode::IsFull });
        // The existing device still resumes.
        h.login([1; 32], addr(3));
    }

    #[test]
    fn test_ping_echoes_time_and_refreshes_activity() {
        let h = Harness::small();
        let creds = h.login([1; 32], addr(1));
        h.clock.advance(500);
        let sent = h.send(&Ping { credentials: creds, client_time: 42 }, addr(9));
        let response = PingResponse::decode(&sent[0].1).unwrap();
        assert_eq!(response.client_time, 42);
        assert_eq!(response.server_time, 1_500);
        assert_eq!(sent[0].0, addr(9));

        let lobby = h.state.lobby();
        let session = lobby.find_by_token(creds.token, creds.slot).unwrap();
        assert_eq!(session.last_active, 1_500);
        assert_eq!(session.peer, addr(9));
    }

    #[test]
    fn test_ping_with_stale_credentials_expires() {
        let h = Harness::small();
        let creds = h.login([1; 32], addr(1));
        let stale = Credentials { token: creds.token + 1, ..creds };
        let error = error_of(&h.send(&Ping { credentials: stale, client_time: 0 }, addr(1)));
        assert_eq!(error.error, ErrorCode::Expired);
        assert_eq!(error.request, MessageType::Ping);

        let wrong_room = Credentials { room: 0, index: 0, ..creds };
        let error = error_of(&h.send(&Ping { credentials: wrong_room, client_time: 0 }, addr(1)));
        assert_eq!(error.error, ErrorCode::Expired);
    }

    #[test]
    fn test_create_makes_creator_master() {
        let h = Harness::small();
        let creds = h.login([1; 32], addr(1));
        let sent = h.send(
            &Create { token: creds.token, slot: creds.slot, open_timeout_secs: 30, properties: [3; 32], params: [1, 2, 3, 4] },
            addr(1),
        );
        let response = CreateResponse::decode(&sent[0].1).unwrap();
        assert_eq!(response.error, ErrorCode::None);
        assert_eq!((response.room, response.index), (0, 0));
        assert_eq!(response.flags & FLAG_MASTER, FLAG_MASTER);
    }

    #[test]
    fn test_create_when_seated_returns_current_seat() {
        let h = Harness::small();
        let creds = h.login([1; 32], addr(1));
        let seated = h.create(creds, addr(1), [0; 4]);
        let again = h.create(creds, addr(1), [0; 4]);
        assert_eq!((again.room, again.index), (seated.room, seated.index));
        assert_eq!(h.state.world().rooms().active_rooms().count(), 1);
    }

    #[test]
    fn test_create_when_table_exhausted_is_full() {
        let h = Harness::small();
        for i in 0..2u8 {
            let creds = h.login([i; 32], addr(u16::from(i)));
            h.create(creds, addr(u16::from(i)), [0; 4]);
        }
        let late = h.login([9; 32], addr(9));
        let error = error_of(&h.send(
            &Create { token: late.token, slot: late.slot, open_timeout_secs: 0, properties: [0; 32], params: [0; 4] },
            addr(9),
        ));
        assert_eq!(error, ErrorResponse { request: MessageType::Create, error: ErrorCode::IsFull });
    }

    #[test]
    fn test_join_returns_room_properties() {
        let h = Harness::small();
        let host = h.login([1; 32], addr(1));
        h.create(host, addr(1), [10, 10, 0, 0]);
        let guest = h.login([2; 32], addr(2));
        let sent = h.send(&Join { token: guest.token, slot: guest.slot, ranges: ANY }, addr(2));
        let response = JoinResponse::decode(&sent[0].1).unwrap();
        assert_eq!(response.error, ErrorCode::None);
        assert_eq!((response.room, response.index), (0, 1));
        assert_eq!(response.properties, [0xAA; 32]);
        assert_eq!(response.flags & FLAG_MASTER, 0);
    }

    #[test]
    fn test_join_outside_ranges_fails_matchmake() {
        let h = Harness::small();
        let host = h.login([1; 32], addr(1));
        h.create(host, addr(1), [10, 10, 0, 0]);
        let guest = h.login([2; 32], addr(2));
        let ranges = [0, 5, 0, 100, i32::MIN, i32::MAX, i32::MIN, i32::MAX];
        let error = error_of(&h.send(&Join { token: guest.token, slot: guest.slot, ranges }, addr(2)));
        assert_eq!(error, ErrorResponse { request: MessageType::Join, error: ErrorCode::Matchmake });
    }

    #[test]
    fn test_join_with_bad_token_expires() {
        let h = Harness::small();
        let guest = h.login([2; 32], addr(2));
        let error = error_of(&h.send(&Join { token: 1, slot: guest.slot, ranges: ANY }, addr(2)));
        assert_eq!(error.error, ErrorCode::Expired);
    }

    #[test]
    fn test_leave_then_logout() {
        let h = Harness::small();
        let creds = h.login([1; 32], addr(1));
        let seated = h.create(creds, addr(1), [0; 4]);

        let error = error_of(&h.send(&Leave { credentials: seated }, addr(1)));
        assert_eq!(error, ErrorResponse { request: MessageType::Leave, error: ErrorCode::None });
        assert!(h.state.world().rooms().room(RoomId(0)).unwrap().is_empty());

        // The old seat no longer resolves.
        let error = error_of(&h.send(&Leave { credentials: seated }, addr(1)));
        assert_eq!(error.error, ErrorCode::Expired);

        let error = error_of(&h.send(&Logout { credentials: creds }, addr(1)));
        assert_eq!(error, ErrorResponse { request: MessageType::Logout, error: ErrorCode::None });
        assert!(h.state.lobby().is_empty());
    }

    #[test]
    fn test_logout_with_slot_outside_lobby_is_dropped() {
        let h = Harness::small();
        let creds = h.login([1; 32], addr(1));
        for slot in [6, 300, -1, i16::MIN] {
            let forged = Credentials { slot, ..creds };
            assert!(h.send(&Logout { credentials: forged }, addr(1)).is_empty());
        }
        assert_eq!(h.state.lobby().len(), 1);

        // In range but unknown still gets an explicit expiry.
        let unknown = Credentials::unseated(30_000, 5);
        let error = error_of(&h.send(&Logout { credentials: unknown }, addr(1)));
        assert_eq!(error, ErrorResponse { request: MessageType::Logout, error: ErrorCode::Expired });
    }

    #[test]
    fn test_leave_with_mismatched_credentials_expires() {
        let h = Harness::small();
        let creds = h.login([1; 32], addr(1));
        let seated = h.create(creds, addr(1), [0; 4]);

        let wrong_token = Credentials { token: seated.token + 1, ..seated };
        let error = error_of(&h.send(&Leave { credentials: wrong_token }, addr(1)));
        assert_eq!(error, ErrorResponse { request: MessageType::Leave, error: ErrorCode::Expired });

        let wrong_index = Credentials { index: 1, ..seated };
        let error = error_of(&h.send(&Leave { credentials: wrong_index }, addr(1)));
        assert_eq!(error.error, ErrorCode::Expired);

        // The seat is untouched.
        let world = h.state.world();
        assert_eq!(world.rooms().room(RoomId(0)).unwrap().member_count(), 1);
    }

    #[test]
    fn test_logout_detaches_from_room() {
        let h = Harness::small();
        let host = h.login([1; 32], addr(1));
        let host = h.create(host, addr(1), [0; 4]);
        let guest = h.login([2; 32], addr(2));
        let guest = h.join(guest, addr(2));

        h.send(&Logout { credentials: host }, addr(1));
        let world = h.state.world();
        let room = world.rooms().room(RoomId(0)).unwrap();
        assert_eq!(room.member_count(), 1);
        assert_eq!(room.member(RoomIndex(1)).map(SlotId::to_wire), Some(guest.slot));
    }

    #[test]
    fn test_unreliable_broadcast_and_unicast() {
        let h = Harness::small();
        let a = h.create(h.login([1; 32], addr(1)), addr(1), [0; 4]);
        h.join(h.login([2; 32], addr(2)), addr(2));
        let c = h.join(h.login([3; 32], addr(3)), addr(3));

        let mut w = PacketWriter::new();
        UnreliableHeader::encode(a, TARGET_OTHERS, b"hi", &mut w).unwrap();
        let sent = h.send_raw(w.as_slice(), addr(1));
        let expected = vec![MessageType::PacketUnreliable as u8, 0, 2, b'h', b'i'];
        assert_eq!(sent, vec![(addr(2), expected.clone()), (addr(3), expected.clone())]);

        UnreliableHeader::encode(a, TARGET_ALL, b"hi", &mut w).unwrap();
        assert_eq!(h.send_raw(w.as_slice(), addr(1)).len(), 3);

        UnreliableHeader::encode(c, 1, b"!", &mut w).unwrap();
        let sent = h.send_raw(w.as_slice(), addr(3));
        assert_eq!(sent, vec![(addr(2), vec![MessageType::PacketUnreliable as u8, 2, 1, b'!'])]);
    }

    #[test]
    fn test_unreliable_with_out_of_range_seat_is_dropped() {
        let h = Harness::small();
        let a = h.create(h.login([1; 32], addr(1)), addr(1), [0; 4]);
        let mut w = PacketWriter::new();
        UnreliableHeader::encode(Credentials { room: 9, ..a }, TARGET_ALL, b"x", &mut w).unwrap();
        assert!(h.send_raw(w.as_slice(), addr(1)).is_empty());
        UnreliableHeader::encode(Credentials { index: 5, ..a }, TARGET_ALL, b"x", &mut w).unwrap();
        assert!(h.send_raw(w.as_slice(), addr(1)).is_empty());
    }

    #[test]
    fn test_unreliable_from_unseated_session_expires() {
        let h = Harness::small();
        let a = h.login([1; 32], addr(1));
        let mut w = PacketWriter::new();
        UnreliableHeader::encode(Credentials { room: 0, index: 0, ..a }, TARGET_ALL, b"x", &mut w).unwrap();
        let error = error_of(&h.send_raw(w.as_slice(), addr(1)));
        assert_eq!(error, ErrorResponse { request: MessageType::PacketUnreliable, error: ErrorCode::Expired });
    }

    #[test]
    fn test_reliable_forward_and_ack_relay() {
        let h = Harness::small();
        let a = h.create(h.login([1; 32], addr(1)), addr(1), [0; 4]);
        let b = h.join(h.login([2; 32], addr(2)), addr(2));

        let mut w = PacketWriter::new();
        ReliableHeader::encode(a, 1, 77, b"data", &mut w).unwrap();
        let sent = h.send_raw(w.as_slice(), addr(1));
        assert_eq!(
            sent,
            vec![(addr(2), vec![MessageType::PacketReliable as u8, 0, 77, 4, b'd', b'a', b't', b'a'])]
        );

        PacketRelied { credentials: b, target: 0, ack: 77 }.encode(&mut w).unwrap();
        let sent = h.send_raw(w.as_slice(), addr(2));
        assert_eq!(sent, vec![(addr(1), vec![MessageType::PacketRelied as u8, 1, 77])]);
    }

    #[test]
    fn test_reliable_to_empty_seat_is_acked_by_server() {
        let h = Harness::small();
        let a = h.create(h.login([1; 32], addr(1)), addr(1), [0; 4]);
        let mut w = PacketWriter::new();
        ReliableHeader::encode(a, 2, 9, b"lost", &mut w).unwrap();
        let sent = h.send_raw(w.as_slice(), addr(1));
        assert_eq!(sent, vec![(addr(1), vec![MessageType::PacketRelied as u8, 2, 9])]);
    }

    #[test]
    fn test_reliable_to_out_of_range_target_is_dropped() {
        let h = Harness::small();
        let a = h.create(h.login([1; 32], addr(1)), addr(1), [0; 4]);
        let mut w = PacketWriter::new();
        ReliableHeader::encode(a, 3, 9, b"x", &mut w).unwrap();
        assert!(h.send_raw(w.as_slice(), addr(1)).is_empty());
        ReliableHeader::encode(a, -1, 9, b"x", &mut w).unwrap();
        assert!(h.send_raw(w.as_slice(), addr(1)).is_empty());
    }

    #[test]
    fn test_relied_to_empty_seat_goes_nowhere() {
        let h = Harness::small();
        let a = h.create(h.login([1; 32], addr(1)), addr(1), [0; 4]);
        let mut w = PacketWriter::new();
        PacketRelied { credentials: a, target: 1, ack: 3 }.encode(&mut w).unwrap();
        assert!(h.send_raw(w.as_slice(), addr(1)).is_empty());
    }

    #[test]
    fn test_truncated_and_unknown_datagrams_are_dropped() {
        let h = Harness::small();
        assert!(h.send_raw(&[], addr(1)).is_empty());
        assert!(h.send_raw(&[42, 1, 2, 3], addr(1)).is_empty());
        assert!(h.send_raw(&[MessageType::Ping as u8, 1, 2], addr(1)).is_empty());

        // Declared payload longer than the datagram.
        let a = h.create(h.login([1; 32], addr(1)), addr(1), [0; 4]);
        let mut w = PacketWriter::new();
        UnreliableHeader::encode(a, TARGET_ALL, b"abcdef", &mut w).unwrap();
        let short = &w.as_slice()[..w.len() - 3];
        assert!(h.send_raw(short, addr(1)).is_empty());
    }
}
