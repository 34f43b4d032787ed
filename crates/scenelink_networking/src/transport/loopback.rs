//! In-process transport for tests and single-process setups.

use super::{InboundHandle, Transport, TransportStats};
use crate::error::TransportError;

/// Delivers every frame straight into a receiver's inbound queue.
#[derive(Debug)]
pub struct LoopbackTransport {
    target: InboundHandle,
    stats: TransportStats,
}

impl LoopbackTransport {
    /// Creates a transport feeding `target`.
    #[must_use]
    pub fn new(target: InboundHandle) -> Self {
        Self { target, stats: TransportStats::default() }
    }
}

impl Transport for LoopbackTransport {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if self.target.push(frame.to_vec()) {
            self.stats.record_send(frame.len());
            Ok(())
        } else {
            self.stats.send_errors += 1;
            Err(TransportError::Disconnected)
        }
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}
