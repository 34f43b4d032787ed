//! # Protocol Error Types
//!
//! Every way a package, a message or an update can be rejected.
//!
//! The split mirrors where a failure is detected:
//!
//! | error | raised by |
//! |-------|-----------|
//! | [`DecodeError`] | byte reader, node unpacker, package layout |
//! | [`ReferenceError`] | package validation (required side-table refs) |
//! | [`ProtocolError`] | message framing and parameter value decoding |
//! | [`ApplyError`] | applying a decoded update to live objects |

use thiserror::Error;

/// Malformed bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer ended before a value could be read.
    #[error("truncated input at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        /// Read position when the short read happened.
        offset: usize,
        /// Bytes the value needed.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// A section held a different number of records than its header count.
    #[error("{section}: header declares {declared} records, decoded {decoded}")]
    CountMismatch {
        /// Section name.
        section: &'static str,
        /// Count from the header.
        declared: u32,
        /// Records actually decodable.
        decoded: u32,
    },

    /// Bytes were left over after the last declared record.
    #[error("{0} trailing bytes after the last record")]
    TrailingBytes(usize),

    /// A field held a value outside its domain.
    #[error("invalid {field}: {value}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// Offending raw value.
        value: i64,
    },

    /// Package magic did not match.
    #[error("bad package magic {0:#010x}")]
    BadMagic(u32),

    /// Package was written by an incompatible format version.
    #[error("unsupported package version {0}")]
    UnsupportedVersion(u16),

    /// Child counts do not describe a single rooted tree.
    #[error("malformed tree at node {node}: {reason}")]
    MalformedTree {
        /// Flat index where the inconsistency was found.
        node: usize,
        /// What went wrong.
        reason: &'static str,
    },
}

/// A required cross-reference points outside its table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// Character root id is not a node index.
    #[error("character {character}: root id {root_id} outside node list of {node_count}")]
    CharacterRoot {
        /// Character table index.
        character: usize,
        /// Offending root id.
        root_id: i32,
        /// Number of nodes in the package.
        node_count: usize,
    },

    /// Authoring graph handle does not belong to the graph being packed.
    #[error("node handle {0} is not part of this scene graph")]
    UnknownNode(usize),
}

/// Framing or typing violation in a message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Leading kind byte is not a known message kind.
    #[error("unknown message kind {0}")]
    UnknownMessageKind(u8),

    /// A known message kind where a different one was required.
    #[error("expected a {expected} frame, got kind {actual}")]
    UnexpectedMessageKind {
        /// Kind name required by the caller.
        expected: &'static str,
        /// Kind byte received.
        actual: u8,
    },

    /// Parameter type tag is not a known type.
    #[error("unknown parameter type tag {0}")]
    UnknownParameterType(u8),

    /// Value bytes do not match the fixed size of their type.
    #[error("parameter type {type_tag} expects {expected} bytes, got {actual}")]
    ValueSizeMismatch {
        /// Declared type tag.
        type_tag: u8,
        /// Size the type requires.
        expected: usize,
        /// Size on the wire.
        actual: usize,
    },

    /// A string or array is longer than a `u32` length prefix can express.
    #[error("field of {0} elements exceeds the u32 length prefix")]
    LengthOverflow(usize),

    /// A bool value byte other than 0 or 1.
    #[error("invalid bool value byte {0}")]
    InvalidBool(u8),

    /// Value does not fit the record length field.
    #[error("parameter value of {0} bytes exceeds the record length field")]
    ValueTooLarge(usize),
}

/// A decoded update could not be applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No live object with this id.
    #[error("unknown object {0}")]
    UnknownObject(u16),

    /// Object has no parameter with this id.
    #[error("object {object}: unknown parameter {parameter}")]
    UnknownParameter {
        /// Object id.
        object: u16,
        /// Parameter id.
        parameter: u16,
    },

    /// Value type differs from the parameter's type.
    #[error("parameter {parameter}: expected type tag {expected}, got {actual}")]
    TypeMismatch {
        /// Parameter id.
        parameter: u16,
        /// Parameter's own type tag.
        expected: u8,
        /// Incoming type tag.
        actual: u8,
    },

    /// Record addressed to a different scene.
    #[error("record for scene {actual}, this participant holds scene {expected}")]
    WrongScene {
        /// Scene held locally.
        expected: u8,
        /// Scene id on the record.
        actual: u8,
    },
}

/// Top-level error for the scene and sync layers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// See [`DecodeError`].
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// See [`ReferenceError`].
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    /// See [`ProtocolError`].
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// See [`ApplyError`].
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

/// Result type for the scene and sync layers.
pub type SyncResult<T> = Result<T, SyncError>;
