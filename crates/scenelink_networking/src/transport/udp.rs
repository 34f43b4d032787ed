//! UDP transport: one datagram per frame, fanned out to every target.

use std::io;
use std::net::{SocketAddr, UdpSocket};

use scenelink_shared::MAX_DATAGRAM_SIZE;
use tracing::warn;

use super::{InboundHandle, Transport, TransportStats};
use crate::error::TransportError;

/// Non-blocking UDP socket with a target list.
pub struct UdpTransport {
    socket: UdpSocket,
    local_addr: SocketAddr,
    targets: Vec<SocketAddr>,
    recv_buffer: Box<[u8]>,
    stats: TransportStats,
}

impl UdpTransport {
    /// Creates a transport bound to `addr`.
    ///
    /// # Errors
    ///
    /// Bind or socket option failure.
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            targets: Vec::new(),
            recv_buffer: vec![0u8; MAX_DATAGRAM_SIZE].into_boxed_slice(),
            stats: TransportStats::default(),
        })
    }

    /// Returns the local address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Adds a destination for [`Transport::send`]. Duplicates are ignored.
    pub fn add_target(&mut self, addr: SocketAddr) {
        if !self.targets.contains(&addr) {
            self.targets.push(addr);
        }
    }

    /// Current destinations.
    #[must_use]
    pub fn targets(&self) -> &[SocketAddr] {
        &self.targets
    }

    /// Receives one datagram, or `None` if nothing is pending.
    pub fn recv(&mut self) -> Option<(&[u8], SocketAddr)> {
        match self.socket.recv_from(&mut self.recv_buffer) {
            Ok((len, addr)) => {
                self.stats.record_recv(len);
                Some((&self.recv_buffer[..len], addr))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => None,
            Err(e) => {
                self.stats.recv_errors += 1;
                warn!("UDP receive failed on {}: {}", self.local_addr, e);
                None
            }
        }
    }

    /// Moves every pending datagram into `inbound`. Returns how many.
    pub fn poll_into(&mut self, inbound: &InboundHandle) -> usize {
        let mut count = 0;
        while let Some((frame, _)) = self.recv() {
            let frame = frame.to_vec();
            if !inbound.push(frame) {
                break;
            }
            count += 1;
        }
        count
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if frame.len() > MAX_DATAGRAM_SIZE {
            return Err(TransportError::FrameTooLarge {
                size: frame.len(),
                limit: MAX_DATAGRAM_SIZE,
            });
        }
        let mut delivered = 0usize;
        let mut last_error = None;
        for target in &self.targets {
            match self.socket.send_to(frame, target) {
                Ok(n) => {
                    self.stats.record_send(n);
                    delivered += 1;
                }
                Err(e) => {
                    self.stats.send_errors += 1;
                    warn!("UDP send to {} failed: {}", target, e);
                    last_error = Some(e);
                }
            }
        }
        // Partial fan-out counts as sent; the failures are logged above.
        match last_error {
            Some(e) if delivered == 0 => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}
