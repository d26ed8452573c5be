//! # Relay Server
//!
//! Thread runtime around the shared [`ServerState`].
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       RELAY SERVER                        │
//! ├───────────────────────────────────────────────────────────┤
//! │  ┌────────────┐ ┌────────────┐       ┌────────────┐       │
//! │  │ Worker 0   │ │ Worker 1   │  ...  │ Worker N   │       │
//! │  │ recv→disp. │ │ recv→disp. │       │ recv→disp. │       │
//! │  └─────┬──────┘ └─────┬──────┘       └─────┬──────┘       │
//! │        └──────────────┼────────────────────┘              │
//! │              ┌────────▼─────────┐    ┌──────────────┐     │
//! │              │   ServerState    │◄───│   Sweeper    │     │
//! │              │ tokens│lobby│rooms│    │  (interval)  │     │
//! │              └──────────────────┘    └──────────────┘     │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Workers share one transport and block on it with a bounded timeout,
//! checking the running flag between receives.

mod dispatch;
mod state;

pub use dispatch::{Dispatcher, Rejection};
pub use state::{ServerState, TokenIssuer, World};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Sender};
use plankton_protocol::MAX_DATAGRAM_SIZE;

use crate::clock::Clock;
use crate::config::RelayConfig;
use crate::error::RelayResult;
use crate::sweeper::Sweeper;
use crate::transport::Transport;

/// The relay server, before it is started.
pub struct RelayServer {
    state: Arc<ServerState>,
}

impl RelayServer {
    /// Validates `config` and allocates every table.
    ///
    /// # Errors
    ///
    /// [`crate::RelayError::Config`] if the configuration is out of range.
    pub fn new(config: RelayConfig, clock: Arc<dyn Clock>) -> RelayResult<Self> {
        config.validate()?;
        Ok(Self {
            state: Arc::new(ServerState::new(config, clock)),
        })
    }

    /// Returns the shared state.
    #[must_use]
    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Spawns the workers and the sweeper on `transport`.
    ///
    /// # Errors
    ///
    /// [`crate::RelayError::Io`] if a thread cannot be spawned or the
    /// transport has no local address. Threads already started are stopped.
    pub fn start(self, transport: Arc<dyn Transport>) -> RelayResult<ServerHandle> {
        let local_addr = transport.local_addr()?;
        let (shutdown_tx, shutdown_rx) = bounded(1);
        let mut handle = ServerHandle {
            state: self.state,
            transport,
            local_addr,
            running: Arc::new(AtomicBool::new(true)),
            workers: Vec::new(),
            sweeper: None,
            shutdown: shutdown_tx,
        };

        let sweeper = Sweeper::new(handle.state.clone());
        let spawned = std::thread::Builder::new()
            .name("plankton-sweeper".into())
            .spawn(move || sweeper.run(&shutdown_rx));
        match spawned {
            Ok(thread) => handle.sweeper = Some(thread),
            Err(e) => {
                handle.shutdown_threads();
                return Err(e.into());
            }
        }

        for id in 0..handle.state.config().worker_threads {
            let state = handle.state.clone();
            let transport = handle.transport.clone();
            let running = handle.running.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("plankton-worker-{id}"))
                .spawn(move || worker_loop(&state, transport.as_ref(), &running));
            match spawned {
                Ok(thread) => handle.workers.push(thread),
                Err(e) => {
                    handle.shutdown_threads();
                    return Err(e.into());
                }
            }
        }

        tracing::info!(
            "Relay listening on {} ({} workers)",
            local_addr,
            handle.workers.len()
        );
        Ok(handle)
    }
}

/// Pause after a receive error before polling the transport again.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(10);

fn worker_loop(state: &ServerState, transport: &dyn Transport, running: &AtomicBool) {
    let mut dispatcher = Dispatcher::new(state, transport);
    let mut buffer = [0u8; MAX_DATAGRAM_SIZE];
    while running.load(Ordering::Relaxed) {
        match transport.recv_from(&mut buffer) {
            Ok(Some((len, peer))) => dispatcher.dispatch(&mut buffer[..len], peer),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Receive failed: {}", e);
                std::thread::sleep(RECV_ERROR_BACKOFF);
            }
        }
    }
}

/// A running server. Dropping it without [`ServerHandle::stop`] leaves the
/// threads running.
pub struct ServerHandle {
    state: Arc<ServerState>,
    transport: Arc<dyn Transport>,
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    sweeper: Option<JoinHandle<()>>,
    shutdown: Sender<()>,
}

impl ServerHandle {
    /// Returns the shared state.
    #[must_use]
    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Transport the workers receive on.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Address the server receives on.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns whether the workers are still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Signals every thread to stop and waits for them.
    pub fn stop(mut self) {
        self.shutdown_threads();
        tracing::info!("Relay stopped");
    }

    /// Waits for the worker threads without signalling them.
    pub fn wait(mut self) {
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("Worker thread panicked");
            }
        }
        self.shutdown_threads();
    }

    fn shutdown_threads(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        // The sweeper may already be gone.
        let _ = self.shutdown.try_send(());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("Worker thread panicked");
            }
        }
        if let Some(sweeper) = self.sweeper.take() {
            if sweeper.join().is_err() {
                tracing::warn!("Sweeper thread panicked");
            }
        }
    }
}
