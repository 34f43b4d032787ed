//! # SCENELINK Shared
//!
//! Value types and constants used by every scenelink participant.
//!
//! ## CRITICAL RULE
//!
//! The float layout of these types IS the wire layout. Every type here is
//! `#[repr(C)]` + `Pod`, so the codec can copy it straight into a buffer.
//! Do not reorder fields.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;

pub use constants::{
    CLIENT_ID, DISTRIBUTION_PORT, MAX_DATAGRAM_SIZE, MAX_UPDATE_FRAME, SERVER_ID, TICK_RATE,
    UPDATE_PORT,
};
pub use math::{Color, Quat, Vec2, Vec3, Vec4};
