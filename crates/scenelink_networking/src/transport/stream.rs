//! Length-prefixed frames over a byte stream.
//!
//! ```text
//! [len u32 LE][frame bytes] [len u32 LE][frame bytes] ...
//! ```

use std::io::{self, Read, Write};

use super::{Transport, TransportStats};
use crate::error::TransportError;

/// Largest frame accepted from a stream.
pub const MAX_STREAM_FRAME: usize = 256 * 1024 * 1024;

/// Writes frames to any `Write`, e.g. a `TcpStream`.
pub struct StreamTransport<W: Write> {
    writer: W,
    stats: TransportStats,
}

impl<W: Write> StreamTransport<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self { writer, stats: TransportStats::default() }
    }

    /// Unwraps the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Transport for StreamTransport<W> {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        let len = u32::try_from(frame.len())
            .ok()
            .filter(|&len| len as usize <= MAX_STREAM_FRAME)
            .ok_or(TransportError::FrameTooLarge { size: frame.len(), limit: MAX_STREAM_FRAME })?;

        let result = self
            .writer
            .write_all(&len.to_le_bytes())
            .and_then(|()| self.writer.write_all(frame))
            .and_then(|()| self.writer.flush());
        match result {
            Ok(()) => {
                self.stats.record_send(frame.len());
                Ok(())
            }
            Err(e) => {
                self.stats.send_errors += 1;
                Err(e.into())
            }
        }
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}

/// Reads frames written by a [`StreamTransport`].
pub struct FrameReader<R: Read> {
    reader: R,
    stats: TransportStats,
}

impl<R: Read> FrameReader<R> {
    /// Wraps a reader.
    pub fn new(reader: R) -> Self {
        Self { reader, stats: TransportStats::default() }
    }

    /// Reads the next frame. `Ok(None)` on a clean end of stream.
    ///
    /// # Errors
    ///
    /// I/O failure, an end of stream inside a frame, or an oversized length.
    pub fn read_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut prefix = [0u8; 4];
        match self.reader.read_exact(&mut prefix) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => {
                self.stats.recv_errors += 1;
                return Err(e.into());
            }
        }

        let len = u32::from_le_bytes(prefix) as usize;
        if len > MAX_STREAM_FRAME {
            self.stats.recv_errors += 1;
            return Err(TransportError::FrameTooLarge { size: len, limit: MAX_STREAM_FRAME });
        }

        let mut frame = vec![0u8; len];
        if let Err(e) = self.reader.read_exact(&mut frame) {
            self.stats.recv_errors += 1;
            return Err(if e.kind() == io::ErrorKind::UnexpectedEof {
                TransportError::Disconnected
            } else {
                e.into()
            });
        }
        self.stats.record_recv(len);
        Ok(Some(frame))
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> TransportStats {
        self.stats
    }
}
