//! # Scene Distribution
//!
//! The server keeps the current scene package frame in a [`PackageStore`].
//! A [`Distributor`] thread accepts stream connections and writes that frame
//! to each one, length-prefixed, then closes the connection. Clients fetch it
//! with [`request_scene`] and push it into their receiver like any other
//! frame.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{NetworkResult, TransportError};
use crate::transport::{FrameReader, StreamTransport, Transport};

/// How long the accept loop sleeps when no connection is pending.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(5);

/// Current scene package frame, shared between the tick thread and the
/// distribution thread.
#[derive(Debug, Default)]
pub struct PackageStore {
    frame: RwLock<Option<Arc<Vec<u8>>>>,
    revision: AtomicU64,
}

impl PackageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current frame. Returns the new revision.
    pub fn publish(&self, frame: Vec<u8>) -> u64 {
        *self.frame.write() = Some(Arc::new(frame));
        self.revision.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// The current frame, if any.
    #[must_use]
    pub fn current(&self) -> Option<Arc<Vec<u8>>> {
        self.frame.read().clone()
    }

    /// Number of publishes so far.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }
}

/// Background thread serving the current package.
pub struct Distributor {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    served: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl Distributor {
    /// Binds `addr` and starts serving `store`.
    ///
    /// # Errors
    ///
    /// Bind or socket option failure.
    pub fn spawn(addr: SocketAddr, store: Arc<PackageStore>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let served = Arc::new(AtomicU64::new(0));
        let handle = {
            let running = Arc::clone(&running);
            let served = Arc::clone(&served);
            thread::Builder::new()
                .name("scene-distributor".to_owned())
                .spawn(move || accept_loop(&listener, &store, &running, &served))?
        };

        info!("Scene distribution listening on {}", local_addr);
        Ok(Self { local_addr, running, served, handle: Some(handle) })
    }

    /// Bound address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Connections that received a package.
    #[must_use]
    pub fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    /// Stops the thread and waits for it.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Scene distributor thread panicked");
            }
        }
    }
}

impl Drop for Distributor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(listener: &TcpListener, store: &PackageStore, running: &AtomicBool, served: &AtomicU64) {
    while running.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, peer)) => match serve(stream, store) {
                Ok(true) => {
                    served.fetch_add(1, Ordering::Relaxed);
                    debug!("Sent scene package to {}", peer);
                }
                Ok(false) => debug!("No scene published yet; closed {}", peer),
                Err(e) => warn!("Scene distribution to {} failed: {}", peer, e),
            },
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_BACKOFF),
            Err(e) => {
                warn!("Accept failed: {}", e);
                thread::sleep(ACCEPT_BACKOFF);
            }
        }
    }
}

fn serve(stream: TcpStream, store: &PackageStore) -> Result<bool, TransportError> {
    let Some(frame) = store.current() else {
        return Ok(false);
    };
    stream.set_nonblocking(false)?;
    let mut transport = StreamTransport::new(stream);
    transport.send(&frame)?;
    Ok(true)
}

/// Connects to a distributor and reads one package frame. `Ok(None)` if the
/// server had nothing published.
///
/// # Errors
///
/// Connection or read failure.
pub fn request_scene(addr: impl ToSocketAddrs, timeout: Duration) -> NetworkResult<Option<Vec<u8>>> {
    let addr = addr
        .to_socket_addrs()
        .map_err(TransportError::from)?
        .next()
        .ok_or(TransportError::Disconnected)?;
    let stream = TcpStream::connect_timeout(&addr, timeout).map_err(TransportError::from)?;
    stream.set_read_timeout(Some(timeout)).map_err(TransportError::from)?;
    let mut reader = FrameReader::new(stream);
    Ok(reader.read_frame()?)
}
