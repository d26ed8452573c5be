//! # Transport Layer
//!
//! Datagram I/O behind a trait, so the server runs the same over a real UDP
//! socket and over in-memory queues in tests.
//!
//! ## Design
//!
//! - One transport is shared by every worker; both methods take `&self`
//! - `recv_from` blocks for at most a bounded timeout and returns `None` on
//!   expiry, which is when workers check for shutdown
//! - Statistics are plain atomics, readable while the server runs

use std::fmt;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

/// Datagram send/receive.
pub trait Transport: Send + Sync {
    /// Receives one datagram into `buffer`.
    ///
    /// Returns `Ok(None)` if nothing arrived before the receive timeout.
    ///
    /// # Errors
    ///
    /// Socket failures other than timeouts.
    fn recv_from(&self, buffer: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>>;

    /// Sends one datagram.
    ///
    /// # Errors
    ///
    /// Socket failures.
    fn send_to(&self, data: &[u8], peer: SocketAddr) -> io::Result<usize>;

    /// Address the transport receives on.
    ///
    /// # Errors
    ///
    /// Socket failures.
    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// Counters since the transport was created.
    fn traffic(&self) -> TransportSnapshot;
}

/// Transport statistics.
#[derive(Debug, Default)]
pub struct TransportStats {
    packets_sent: AtomicU64,
    packets_received: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    send_errors: AtomicU64,
    recv_errors: AtomicU64,
}

/// Point-in-time copy of [`TransportStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportSnapshot {
    /// Packets sent.
    pub packets_sent: u64,
    /// Packets received.
    pub packets_received: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Bytes received.
    pub bytes_received: u64,
    /// Send errors.
    pub send_errors: u64,
    /// Receive errors.
    pub recv_errors: u64,
}

impl fmt::Display for TransportSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Traffic: {} packets in ({} bytes), {} out ({} bytes), {} recv errors, {} send errors",
            self.packets_received,
            self.bytes_received,
            self.packets_sent,
            self.bytes_sent,
            self.recv_errors,
            self.send_errors
        )
    }
}

impl TransportStats {
    fn record_send(&self, result: &io::Result<usize>) {
        match result {
            Ok(n) => {
                self.packets_sent.fetch_add(1, Ordering::Relaxed);
                self.bytes_sent.fetch_add(*n as u64, Ordering::Relaxed);
            }
            Err(_) => {
                self.send_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn record_recv(&self, len: usize) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(len as u64, Ordering::Relaxed);
    }

    /// Copies the current counters.
    #[must_use]
    pub fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            recv_errors: self.recv_errors.load(Ordering::Relaxed),
        }
    }
}

/// UDP socket transport.
pub struct UdpTransport {
    socket: UdpSocket,
    local_addr: SocketAddr,
    stats: TransportStats,
}

impl UdpTransport {
    /// Binds a socket whose receives give up after `recv_timeout`.
    ///
    /// # Errors
    ///
    /// Bind or socket option failures.
    pub fn bind(addr: SocketAddr, recv_timeout: Duration) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(recv_timeout))?;
        let local_addr = socket.local_addr()?;
        Ok(Self {
            socket,
            local_addr,
            stats: TransportStats::default(),
        })
    }

}

impl Transport for UdpTransport {
    fn recv_from(&self, buffer: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.socket.recv_from(buffer) {
            Ok((len, peer)) => {
                self.stats.record_recv(len);
                Ok(Some((len, peer)))
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => Ok(None),
            // ICMP port-unreachable from a departed peer surfaces here on some platforms.
            Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {
                self.stats.recv_errors.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Err(e) => {
                self.stats.recv_errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    fn send_to(&self, data: &[u8], peer: SocketAddr) -> io::Result<usize> {
        let result = self.socket.send_to(data, peer);
        self.stats.record_send(&result);
        result
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.local_addr)
    }

    fn traffic(&self) -> TransportSnapshot {
        self.stats.snapshot()
    }
}

/// In-memory transport for tests and benchmarks.
///
/// Datagrams pushed with [`MemoryTransport::inject`] are received by the
/// server; everything the server sends is recorded.
pub struct MemoryTransport {
    local_addr: SocketAddr,
    inbound_tx: Sender<(Vec<u8>, SocketAddr)>,
    inbound_rx: Receiver<(Vec<u8>, SocketAddr)>,
    outbound: Mutex<Vec<(SocketAddr, Vec<u8>)>>,
    recv_timeout: Duration,
    stats: TransportStats,
}

impl MemoryTransport {
    /// Creates an empty transport.
    #[must_use]
    pub fn new(local_addr: SocketAddr, recv_timeout: Duration) -> Self {
        let (inbound_tx, inbound_rx) = unbounded();
        Self {
            local_addr,
            inbound_tx,
            inbound_rx,
            outbound: Mutex::new(Vec::new()),
            recv_timeout,
            stats: TransportStats::default(),
        }
    }

    /// Queues a datagram as if `from` had sent it.
    pub fn inject(&self, data: &[u8], from: SocketAddr) {
        // The receiver lives as long as `self`.
        let _ = self.inbound_tx.send((data.to_vec(), from));
    }

    /// Drains every datagram sent so far.
    pub fn take_sent(&self) -> Vec<(SocketAddr, Vec<u8>)> {
        std::mem::take(&mut *self.outbound.lock())
    }

}

impl Transport for MemoryTransport {
    fn recv_from(&self, buffer: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.inbound_rx.recv_timeout(self.recv_timeout) {
            Ok((data, from)) => {
                let len = data.len().min(buffer.len());
                buffer[..len].copy_from_slice(&data[..len]);
                self.stats.record_recv(len);
                Ok(Some((len, from)))
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    fn send_to(&self, data: &[u8], peer: SocketAddr) -> io::Result<usize> {
        self.outbound.lock().push((peer, data.to_vec()));
        let result = Ok(data.len());
        self.stats.record_send(&result);
        result
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.local_addr)
    }

    fn traffic(&self) -> TransportSnapshot {
        self.stats.snapshot()
    }
}
