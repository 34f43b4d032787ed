//! # Receiver Role
//!
//! I/O threads push raw frames into the inbound queue through an
//! [`InboundHandle`]. The owning thread calls [`SceneReceiver::drain`] once
//! per tick; frames are handled in receipt order and every outcome is
//! reported as a [`ReceiverEvent`].
//!
//! A bad frame or a bad record never stops the drain.

use crossbeam_channel::{unbounded, Receiver};
use scenelink_protocol::{
    peek_kind, LoadSettings, Message, MessageKind, ObjectId, ParameterId, SceneData,
    SceneDataHandler, SyncError,
};
use tracing::{debug, info, warn};

use crate::registry::SceneRegistry;
use crate::transport::InboundHandle;

/// Outcome of one inbound frame or record.
#[derive(Debug)]
pub enum ReceiverEvent {
    /// A scene package was decoded and the registry rebuilt.
    SceneLoaded(Box<SceneData>),
    /// A scene package could not be decoded or replayed. The previous scene
    /// was cleared only if decoding succeeded.
    SceneLoadFailed(SyncError),
    /// A parameter update was applied.
    ParameterApplied {
        /// Target object.
        object_id: ObjectId,
        /// Target parameter.
        parameter_id: ParameterId,
    },
    /// A parameter update was rejected; the rest of its frame still applies.
    UpdateRejected {
        /// Target object.
        object_id: ObjectId,
        /// Target parameter.
        parameter_id: ParameterId,
        /// Why.
        error: SyncError,
    },
    /// An object's edit lock changed.
    LockChanged {
        /// Target object.
        object_id: ObjectId,
        /// New state.
        locked: bool,
    },
    /// An object was restored to its initial values.
    ObjectReset(ObjectId),
    /// The sender's clock was received.
    ClockSynced(u8),
    /// A ping arrived.
    PingReceived {
        /// Sending participant.
        client_id: u8,
        /// Sender's clock when it pinged.
        time: u8,
    },
    /// A pong answering one of this participant's pings arrived.
    PongReceived {
        /// Answering participant.
        client_id: u8,
        /// Clock value the ping carried.
        ping_time: u8,
    },
    /// A frame could not be classified or decoded.
    FrameRejected(SyncError),
}

/// Receiver counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Frames taken from the inbound queue.
    pub frames: u64,
    /// Frames carrying this participant's own id.
    pub echoes_ignored: u64,
    /// Frames that failed to decode.
    pub frames_rejected: u64,
    /// Update records applied.
    pub updates_applied: u64,
    /// Update records rejected.
    pub updates_rejected: u64,
    /// Scenes loaded.
    pub scenes_loaded: u64,
}

/// Inbound half of a participant.
pub struct SceneReceiver {
    client_id: u8,
    handler: SceneDataHandler,
    inbound_tx: crossbeam_channel::Sender<Vec<u8>>,
    inbound_rx: Receiver<Vec<u8>>,
    stats: ReceiverStats,
}

impl SceneReceiver {
    /// Creates a receiver for `client_id`.
    #[must_use]
    pub fn new(client_id: u8, settings: LoadSettings) -> Self {
        let (inbound_tx, inbound_rx) = unbounded();
        Self {
            client_id,
            handler: SceneDataHandler::new(settings),
            inbound_tx,
            inbound_rx,
            stats: ReceiverStats::default(),
        }
    }

    /// Producer handle for I/O threads and loopback transports.
    #[must_use]
    pub fn inbound(&self) -> InboundHandle {
        InboundHandle::new(self.inbound_tx.clone())
    }

    /// Frames waiting to be drained.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inbound_rx.len()
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> ReceiverStats {
        self.stats
    }

    /// Handles every queued frame against `registry`.
    pub fn drain(&mut self, registry: &mut SceneRegistry) -> Vec<ReceiverEvent> {
        let mut events = Vec::new();
        while let Ok(frame) = self.inbound_rx.try_recv() {
            self.stats.frames += 1;
            self.handle_frame(&frame, registry, &mut events);
        }
        events
    }

    fn handle_frame(&mut self, frame: &[u8], registry: &mut SceneRegistry, events: &mut Vec<ReceiverEvent>) {
        let message = match peek_kind(frame).and_then(|_| Message::decode(frame)) {
            Ok(message) => message,
            Err(e) => {
                self.stats.frames_rejected += 1;
                warn!("Rejected frame of {} bytes: {}", frame.len(), e);
                events.push(ReceiverEvent::FrameRejected(e));
                return;
            }
        };

        if message.header().client_id == self.client_id {
            self.stats.echoes_ignored += 1;
            return;
        }

        match message {
            Message::ScenePackage { package, .. } => {
                events.push(self.load_scene(&package, registry));
            }
            Message::ParameterUpdate { updates, .. } => {
                for update in &updates {
                    let (object_id, parameter_id) = (update.object_id, update.parameter_id);
                    match registry.apply(update) {
                        Ok(()) => {
                            self.stats.updates_applied += 1;
                            events.push(ReceiverEvent::ParameterApplied { object_id, parameter_id });
                        }
                        Err(error) => {
                            self.stats.updates_rejected += 1;
                            warn!("Rejected update {}/{}: {}", object_id, parameter_id, error);
                            events.push(ReceiverEvent::UpdateRejected { object_id, parameter_id, error });
                        }
                    }
                }
            }
            Message::Lock { scene_id, object_id, locked, .. } => {
                match registry.check_scene(scene_id).and_then(|()| registry.set_locked(object_id, locked)) {
                    Ok(()) => events.push(ReceiverEvent::LockChanged { object_id, locked }),
                    Err(e) => {
                        warn!("Lock for object {} rejected: {}", object_id, e);
                        events.push(ReceiverEvent::FrameRejected(e.into()));
                    }
                }
            }
            Message::ResetObject { scene_id, object_id, .. } => {
                match registry.check_scene(scene_id).and_then(|()| registry.reset_object(object_id)) {
                    Ok(()) => events.push(ReceiverEvent::ObjectReset(object_id)),
                    Err(e) => {
                        warn!("Reset for object {} rejected: {}", object_id, e);
                        events.push(ReceiverEvent::FrameRejected(e.into()));
                    }
                }
            }
            Message::Sync { header } => events.push(ReceiverEvent::ClockSynced(header.time)),
            Message::Ping { header } => {
                debug!("Ping from client {}", header.client_id);
                events.push(ReceiverEvent::PingReceived { client_id: header.client_id, time: header.time });
            }
            Message::Pong { header, target, ping_time } => {
                if target == self.client_id {
                    events.push(ReceiverEvent::PongReceived { client_id: header.client_id, ping_time });
                } else {
                    debug!("Pong for client {} ignored", target);
                }
            }
        }
    }

    fn load_scene(&mut self, package: &[u8], registry: &mut SceneRegistry) -> ReceiverEvent {
        let scene = match self.handler.unpack(package) {
            Ok(scene) => scene,
            Err(e) => {
                warn!("Scene package rejected: {}", e);
                return ReceiverEvent::SceneLoadFailed(e);
            }
        };
        match registry.load_scene(&self.handler, &scene) {
            Ok(_) => {
                self.stats.scenes_loaded += 1;
                info!(
                    "Scene loaded: {} nodes, {} live objects",
                    scene.nodes.len(),
                    registry.len()
                );
                ReceiverEvent::SceneLoaded(Box::new(scene))
            }
            Err(e) => {
                warn!("Scene replay failed: {}", e);
                ReceiverEvent::SceneLoadFailed(e)
            }
        }
    }
}
