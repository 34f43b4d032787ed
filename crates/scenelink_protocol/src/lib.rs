//! # SCENELINK Protocol
//!
//! Wire formats for scene distribution and live parameter sync.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      SCENE PACKAGE                         │
//! ├────────────────────────────────────────────────────────────┤
//! │  SceneGraph ──▶ SceneDataHandler::pack ──▶ bytes           │
//! │  bytes ──▶ SceneDataHandler::unpack ──▶ SceneData          │
//! │  SceneData ──▶ SceneDataHandler::replay ──▶ constructor    │
//! ├────────────────────────────────────────────────────────────┤
//! │                      PARAMETER SYNC                        │
//! ├────────────────────────────────────────────────────────────┤
//! │  Parameter::set ──▶ ParameterChange ──▶ UpdateMessage      │
//! │  Message::decode ──▶ UpdateMessage ──▶ apply_silent        │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Layout rules
//!
//! - Little-endian scalars, `u32`-prefixed arrays (see [`codec`]).
//! - Node records are a pre-order flattening; `child_count` carries the
//!   structure.
//! - Side-table references are `i32` indices, −1 meaning none.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod error;
pub mod message;
pub mod parameter;
pub mod scene;

pub use codec::{ByteReader, ByteWriter};
pub use error::{ApplyError, DecodeError, ProtocolError, ReferenceError, SyncError, SyncResult};
pub use message::{peek_kind, Message, MessageHeader, MessageKind, UpdateMessage};
pub use parameter::{
    AbstractParameter, ObjectId, ObjectKind, Parameter, ParameterChange, ParameterData,
    ParameterId, ParameterType, ParameterValue, SceneObject,
};
pub use scene::{
    LoadSettings, NodePayload, SceneConstructor, SceneData, SceneDataHandler, SceneGraph,
    SceneNode,
};
