//! # Sync Messages
//!
//! Every frame starts with a 3-byte header:
//!
//! ```text
//! [kind u8][client_id u8][time u8]
//! ```
//!
//! Bodies by kind:
//!
//! | kind | body |
//! |------|------|
//! | `ParameterUpdate` | repeated `[scene u8][object u16][parameter u16][type u8][len u16][data]` |
//! | `Lock` | `[scene u8][object u16][locked u8]` |
//! | `Sync`, `Ping` | empty |
//! | `Pong` | `[target client u8][ping time u8]` |
//! | `ResetObject` | `[scene u8][object u16]` |
//! | `ScenePackage` | scene package bytes |

use crate::codec::{ByteReader, ByteWriter};
use crate::error::{DecodeError, ProtocolError, SyncError, SyncResult};
use crate::parameter::{ObjectId, ParameterChange, ParameterId, ParameterType, ParameterValue};

/// Frame kind, the first byte of every frame.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Batched parameter updates.
    ParameterUpdate = 0,
    /// Edit lock taken or released.
    Lock = 1,
    /// Clock sync from the server.
    Sync = 2,
    /// Liveness ping.
    Ping = 3,
    /// Restore an object's initial parameter values.
    ResetObject = 6,
    /// Full scene package.
    ScenePackage = 8,
    /// Answer to a ping, echoing its clock value.
    Pong = 9,
}

impl MessageKind {
    /// Maps a wire byte back to a kind.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::ParameterUpdate),
            1 => Some(Self::Lock),
            2 => Some(Self::Sync),
            3 => Some(Self::Ping),
            6 => Some(Self::ResetObject),
            8 => Some(Self::ScenePackage),
            9 => Some(Self::Pong),
            _ => None,
        }
    }
}

/// Frame header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageHeader {
    /// Frame kind.
    pub kind: MessageKind,
    /// Sending participant.
    pub client_id: u8,
    /// Sender's clock, wrapping.
    pub time: u8,
}

impl MessageHeader {
    /// Size in bytes.
    pub const SIZE: usize = 3;

    fn write(self, writer: &mut ByteWriter) {
        writer.write_u8(self.kind as u8);
        writer.write_u8(self.client_id);
        writer.write_u8(self.time);
    }

    fn read(reader: &mut ByteReader<'_>) -> SyncResult<Self> {
        let tag = reader.read_u8()?;
        let kind = MessageKind::from_u8(tag).ok_or(ProtocolError::UnknownMessageKind(tag))?;
        Ok(Self { kind, client_id: reader.read_u8()?, time: reader.read_u8()? })
    }
}

/// One parameter update record. The value stays raw until
/// [`UpdateMessage::value`] is called, so one bad record does not poison
/// the rest of its frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateMessage {
    /// Scene id.
    pub scene_id: u8,
    /// Target object.
    pub object_id: ObjectId,
    /// Target parameter.
    pub parameter_id: ParameterId,
    /// Raw type tag.
    pub type_tag: u8,
    /// Raw value bytes.
    pub data: Vec<u8>,
}

impl UpdateMessage {
    /// Fixed bytes before the value.
    pub const RECORD_HEADER_SIZE: usize = 8;

    /// Builds a record from a typed value.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::ValueTooLarge`] if the value exceeds the `u16`
    /// length field.
    pub fn new(
        scene_id: u8,
        object_id: ObjectId,
        parameter_id: ParameterId,
        value: &ParameterValue,
    ) -> Result<Self, ProtocolError> {
        let data = value.to_bytes();
        if data.len() > usize::from(u16::MAX) {
            return Err(ProtocolError::ValueTooLarge(data.len()));
        }
        Ok(Self {
            scene_id,
            object_id,
            parameter_id,
            type_tag: value.parameter_type() as u8,
            data,
        })
    }

    /// Builds a record from a parameter change notification.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn from_change(scene_id: u8, change: &ParameterChange) -> Result<Self, ProtocolError> {
        Self::new(scene_id, change.object_id, change.parameter_id, &change.value)
    }

    /// Decodes the typed value.
    ///
    /// # Errors
    ///
    /// Unknown type tag or wrong value size.
    pub fn value(&self) -> Result<ParameterValue, ProtocolError> {
        let ty = ParameterType::from_u8(self.type_tag)
            .ok_or(ProtocolError::UnknownParameterType(self.type_tag))?;
        ParameterValue::from_bytes(ty, &self.data)
    }

    /// Encoded size of this record.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        Self::RECORD_HEADER_SIZE + self.data.len()
    }

    /// Appends this record.
    pub fn encode(&self, writer: &mut ByteWriter) {
        writer.write_u8(self.scene_id);
        writer.write_u16(self.object_id.0);
        writer.write_u16(self.parameter_id.0);
        writer.write_u8(self.type_tag);
        // Length is bounded by `new`; a hand-built oversized record is cut.
        let len = u16::try_from(self.data.len()).unwrap_or(u16::MAX);
        writer.write_u16(len);
        writer.write_raw(&self.data[..usize::from(len)]);
    }

    /// Decodes one record from the start of `bytes`, returning it and the
    /// bytes it occupied.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Truncated`] on a short buffer.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), DecodeError> {
        let mut reader = ByteReader::new(bytes);
        let record = Self::read(&mut reader)?;
        Ok((record, reader.position()))
    }

    fn read(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let scene_id = reader.read_u8()?;
        let object_id = ObjectId(reader.read_u16()?);
        let parameter_id = ParameterId(reader.read_u16()?);
        let type_tag = reader.read_u8()?;
        let len = reader.read_u16()?;
        let data = reader.read_raw(usize::from(len))?.to_vec();
        Ok(Self { scene_id, object_id, parameter_id, type_tag, data })
    }
}

/// A decoded frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Parameter updates, in send order.
    ParameterUpdate {
        /// Frame header.
        header: MessageHeader,
        /// Records.
        updates: Vec<UpdateMessage>,
    },
    /// Edit lock change.
    Lock {
        /// Frame header.
        header: MessageHeader,
        /// Scene id.
        scene_id: u8,
        /// Locked object.
        object_id: ObjectId,
        /// New lock state.
        locked: bool,
    },
    /// Clock sync; the time is in the header.
    Sync {
        /// Frame header.
        header: MessageHeader,
    },
    /// Liveness ping.
    Ping {
        /// Frame header.
        header: MessageHeader,
    },
    /// Answer to a ping.
    Pong {
        /// Frame header.
        header: MessageHeader,
        /// Participant that sent the ping.
        target: u8,
        /// Clock value carried by the ping.
        ping_time: u8,
    },
    /// Reset an object to its initial values.
    ResetObject {
        /// Frame header.
        header: MessageHeader,
        /// Scene id.
        scene_id: u8,
        /// Target object.
        object_id: ObjectId,
    },
    /// Full scene package.
    ScenePackage {
        /// Frame header.
        header: MessageHeader,
        /// Package bytes.
        package: Vec<u8>,
    },
}

impl Message {
    /// Frame header.
    #[must_use]
    pub const fn header(&self) -> &MessageHeader {
        match self {
            Self::ParameterUpdate { header, .. }
            | Self::Lock { header, .. }
            | Self::Sync { header }
            | Self::Ping { header }
            | Self::Pong { header, .. }
            | Self::ResetObject { header, .. }
            | Self::ScenePackage { header, .. } => header,
        }
    }

    /// Frame kind.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.header().kind
    }

    /// Encodes the frame.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(64);
        self.header().write(&mut writer);
        match self {
            Self::ParameterUpdate { updates, .. } => {
                for update in updates {
                    update.encode(&mut writer);
                }
            }
            Self::Lock { scene_id, object_id, locked, .. } => {
                writer.write_u8(*scene_id);
                writer.write_u16(object_id.0);
                writer.write_bool(*locked);
            }
            Self::Sync { .. } | Self::Ping { .. } => {}
            Self::Pong { target, ping_time, .. } => {
                writer.write_u8(*target);
                writer.write_u8(*ping_time);
            }
            Self::ResetObject { scene_id, object_id, .. } => {
                writer.write_u8(*scene_id);
                writer.write_u16(object_id.0);
            }
            Self::ScenePackage { package, .. } => writer.write_raw(package),
        }
        writer.into_bytes()
    }

    /// Decodes a frame.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownMessageKind`], truncation, or trailing bytes
    /// in fixed-size bodies.
    pub fn decode(bytes: &[u8]) -> SyncResult<Self> {
        let mut reader = ByteReader::new(bytes);
        let header = MessageHeader::read(&mut reader)?;

        let message = match header.kind {
            MessageKind::ParameterUpdate => {
                let mut updates = Vec::new();
                while !reader.is_exhausted() {
                    updates.push(UpdateMessage::read(&mut reader)?);
                }
                Self::ParameterUpdate { header, updates }
            }
            MessageKind::Lock => Self::Lock {
                header,
                scene_id: reader.read_u8()?,
                object_id: ObjectId(reader.read_u16()?),
                locked: reader.read_bool()?,
            },
            MessageKind::Sync => Self::Sync { header },
            MessageKind::Ping => Self::Ping { header },
            MessageKind::Pong => Self::Pong { header, target: reader.read_u8()?, ping_time: reader.read_u8()? },
            MessageKind::ResetObject => Self::ResetObject {
                header,
                scene_id: reader.read_u8()?,
                object_id: ObjectId(reader.read_u16()?),
            },
            MessageKind::ScenePackage => {
                let package = reader.read_raw(reader.remaining())?.to_vec();
                Self::ScenePackage { header, package }
            }
        };

        if !reader.is_exhausted() {
            return Err(SyncError::Decode(DecodeError::TrailingBytes(reader.remaining())));
        }
        Ok(message)
    }
}

/// Reads only the kind byte, for routing without a full decode.
///
/// # Errors
///
/// Empty frame or unknown kind.
pub fn peek_kind(frame: &[u8]) -> SyncResult<MessageKind> {
    let tag = *frame.first().ok_or(DecodeError::Truncated { offset: 0, needed: 1, available: 0 })?;
    Ok(MessageKind::from_u8(tag).ok_or(ProtocolError::UnknownMessageKind(tag))?)
}
