//! # Network Constants
//!
//! Default ports and size limits. Runtime overrides come from the
//! networking crate's `SyncConfig`; these are the values it falls back to.

// =============================================================================
// PORTS
// =============================================================================

/// Scene package distribution (stream).
pub const DISTRIBUTION_PORT: u16 = 5555;

/// Broadcast of every live frame: updates, locks, resets, sync, ping and pong.
pub const UPDATE_PORT: u16 = 5557;

// =============================================================================
// PARTICIPANTS
// =============================================================================

/// Participant id of the scene server.
pub const SERVER_ID: u8 = 1;

/// Default participant id of a client.
pub const CLIENT_ID: u8 = 2;

// =============================================================================
// TIMING
// =============================================================================

/// Tick rate (updates per second).
pub const TICK_RATE: u32 = 60;

// =============================================================================
// SIZES
// =============================================================================

/// Largest UDP payload we ever hand to the socket.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Soft limit for one parameter-update frame.
///
/// The sender starts a new frame instead of crossing this. A single record
/// larger than the limit still goes out alone.
pub const MAX_UPDATE_FRAME: usize = 1200;
