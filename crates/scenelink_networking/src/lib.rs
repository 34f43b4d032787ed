//! # SCENELINK Networking
//!
//! Sender and receiver roles for scene distribution and live parameter sync.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        SYNC SESSION                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  I/O thread ──frames──▶ InboundHandle ──▶ SceneReceiver      │
//! │                                              │ drain (tick)   │
//! │                                              ▼                │
//! │                                        SceneRegistry          │
//! │                                              │ set()          │
//! │                                              ▼                │
//! │  Transport ◀──frames── SceneSender ◀── change channel        │
//! │  ping / pong / sync ──▶ ClockSync ──▶ sender clock           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All scene mutation happens on the thread that owns the session. Other
//! threads only push raw frames into the inbound queue, and the server's
//! distribution thread only reads the published package.
//!
//! ## Example
//!
//! ```rust,ignore
//! use scenelink_networking::{LoopbackTransport, SyncConfig, SyncSession, TickLoop};
//!
//! let config = SyncConfig::load("client.toml")?;
//! let mut session = SyncSession::new(&config, transport);
//! let mut ticks = TickLoop::new(config.tick_rate);
//! loop {
//!     while ticks.should_tick() {
//!         let start = ticks.begin_tick();
//!         for event in session.tick()? { /* ... */ }
//!         ticks.end_tick(start);
//!     }
//!     ticks.wait_for_next_tick();
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod config;
pub mod error;
pub mod publisher;
pub mod receiver;
pub mod registry;
pub mod sender;
pub mod session;
pub mod tick;
pub mod transport;

pub use clock::{clock_distance, ClockSync};
pub use config::SyncConfig;
pub use error::{ConfigError, NetworkError, NetworkResult, TransportError};
pub use publisher::{request_scene, Distributor, PackageStore};
pub use receiver::{ReceiverEvent, ReceiverStats, SceneReceiver};
pub use registry::{RegistryBuilder, SceneRegistry};
pub use sender::{scene_frame, SceneSender, SenderStats};
pub use session::SyncSession;
pub use tick::{TickLoop, TickStats};
pub use transport::{
    FrameReader, InboundHandle, LoopbackTransport, StreamTransport, Transport, TransportStats,
    UdpTransport,
};
