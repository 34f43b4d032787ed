//! # Transport Layer
//!
//! Frames out, frames in. A transport never looks inside a frame.
//!
//! ## Design
//!
//! - [`UdpTransport`]: one datagram per frame, for parameter updates
//! - [`StreamTransport`] / [`FrameReader`]: `u32` length prefix over any
//!   byte stream, for scene packages
//! - [`LoopbackTransport`]: straight into a receiver's inbound queue
//!
//! Receipt is always the same: whoever reads the wire pushes raw frames
//! into an [`InboundHandle`], and the receiver drains them on its tick.

mod loopback;
mod stream;
mod udp;

pub use loopback::LoopbackTransport;
pub use stream::{FrameReader, StreamTransport, MAX_STREAM_FRAME};
pub use udp::UdpTransport;

use crossbeam_channel::Sender;

use crate::error::TransportError;

/// Outbound side of a transport.
pub trait Transport {
    /// Sends one frame.
    ///
    /// # Errors
    ///
    /// Any [`TransportError`]; the frame is not sent.
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Counters so far.
    fn stats(&self) -> TransportStats;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        (**self).send(frame)
    }

    fn stats(&self) -> TransportStats {
        (**self).stats()
    }
}

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Frames sent.
    pub frames_sent: u64,
    /// Frames received.
    pub frames_received: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Bytes received.
    pub bytes_received: u64,
    /// Send errors.
    pub send_errors: u64,
    /// Receive errors.
    pub recv_errors: u64,
}

impl TransportStats {
    pub(crate) fn record_send(&mut self, len: usize) {
        self.frames_sent += 1;
        self.bytes_sent += len as u64;
    }

    pub(crate) fn record_recv(&mut self, len: usize) {
        self.frames_received += 1;
        self.bytes_received += len as u64;
    }
}

/// Producer end of a receiver's inbound frame queue.
///
/// Cheap to clone; hand one to every I/O thread.
#[derive(Clone, Debug)]
pub struct InboundHandle {
    tx: Sender<Vec<u8>>,
}

impl InboundHandle {
    pub(crate) const fn new(tx: Sender<Vec<u8>>) -> Self {
        Self { tx }
    }

    /// Enqueues one received frame. Returns false if the receiver is gone.
    pub fn push(&self, frame: Vec<u8>) -> bool {
        self.tx.send(frame).is_ok()
    }
}
