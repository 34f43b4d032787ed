//! # Sync Session
//!
//! One participant: a registry of live objects, a receiver feeding it, and a
//! sender carrying its local edits out.
//!
//! ```text
//! tick():  inbound frames ──drain──▶ registry (silent)
//!          ping / pong / sync ──────▶ clock
//!          registry edits ──flush──▶ transport
//! ```
//!
//! A server session answers pings. A client session measures round trips
//! from the pongs and corrects its clock on every sync.

use scenelink_protocol::{
    Message, ProtocolError, SceneData, SceneDataHandler, SceneGraph, SyncError,
};
use tracing::{debug, info};

use crate::clock::ClockSync;
use crate::config::SyncConfig;
use crate::error::NetworkResult;
use crate::receiver::{ReceiverEvent, SceneReceiver};
use crate::registry::SceneRegistry;
use crate::sender::SceneSender;
use crate::transport::{InboundHandle, Transport};

/// A participant in the sync protocol.
pub struct SyncSession<T: Transport> {
    handler: SceneDataHandler,
    registry: SceneRegistry,
    receiver: SceneReceiver,
    sender: SceneSender<T>,
    clock: ClockSync,
    is_server: bool,
}

impl<T: Transport> SyncSession<T> {
    /// Creates a client session for `config` sending over `transport`.
    pub fn new(config: &SyncConfig, transport: T) -> Self {
        Self::with_role(config, transport, false)
    }

    /// Creates the server session for `config`, identified by `server_id`.
    pub fn server(config: &SyncConfig, transport: T) -> Self {
        Self::with_role(config, transport, true)
    }

    fn with_role(config: &SyncConfig, transport: T, is_server: bool) -> Self {
        let participant_id = if is_server { config.server_id } else { config.client_id };
        let settings = config.load_settings();
        let sender = SceneSender::new(transport, participant_id, config.scene_id)
            .with_max_frame(config.max_update_frame);
        let mut registry = SceneRegistry::new(config.scene_id);
        registry.set_change_sink(sender.change_sink());

        Self {
            handler: SceneDataHandler::new(settings),
            registry,
            receiver: SceneReceiver::new(participant_id, settings),
            sender,
            clock: ClockSync::new(),
            is_server,
        }
    }

    /// Id stamped on this participant's frames.
    #[must_use]
    pub const fn participant_id(&self) -> u8 {
        self.sender.client_id()
    }

    /// True for the server session.
    #[must_use]
    pub const fn is_server(&self) -> bool {
        self.is_server
    }

    /// Round-trip estimate.
    #[must_use]
    pub const fn clock(&self) -> &ClockSync {
        &self.clock
    }

    /// Live objects.
    #[must_use]
    pub const fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    /// Live objects, for local edits.
    pub fn registry_mut(&mut self) -> &mut SceneRegistry {
        &mut self.registry
    }

    /// Inbound queue handle for I/O threads.
    #[must_use]
    pub fn inbound(&self) -> InboundHandle {
        self.receiver.inbound()
    }

    /// The receiver.
    #[must_use]
    pub const fn receiver(&self) -> &SceneReceiver {
        &self.receiver
    }

    /// The sender.
    #[must_use]
    pub const fn sender(&self) -> &SceneSender<T> {
        &self.sender
    }

    /// The sender, for control frames.
    pub fn sender_mut(&mut self) -> &mut SceneSender<T> {
        &mut self.sender
    }

    /// Packs `graph`, loads it locally and sends it. Returns the package.
    ///
    /// # Errors
    ///
    /// Packing, local load, or transport failure.
    pub fn publish_scene(&mut self, graph: &SceneGraph) -> NetworkResult<Vec<u8>> {
        let package = self.handler.pack(graph)?;
        self.adopt_scene(&package)?;
        self.sender.send_scene(&package)?;
        Ok(package)
    }

    /// Decodes `package` and rebuilds the registry from it without sending.
    ///
    /// # Errors
    ///
    /// Decode or replay failure.
    pub fn adopt_scene(&mut self, package: &[u8]) -> NetworkResult<SceneData> {
        let scene = self.handler.unpack(package)?;
        self.registry.load_scene(&self.handler, &scene)?;
        info!("Adopted scene: {} nodes, {} live objects", scene.nodes.len(), self.registry.len());
        Ok(scene)
    }

    /// Adopts a scene package frame as served by the distributor. The
    /// frame is loaded whatever participant id it carries.
    ///
    /// # Errors
    ///
    /// A frame of another kind, or decode or replay failure.
    pub fn adopt_scene_frame(&mut self, frame: &[u8]) -> NetworkResult<SceneData> {
        match Message::decode(frame)? {
            Message::ScenePackage { package, .. } => self.adopt_scene(&package),
            other => Err(SyncError::from(ProtocolError::UnexpectedMessageKind {
                expected: "scene package",
                actual: other.kind() as u8,
            })
            .into()),
        }
    }

    /// Pings the server with the current clock.
    ///
    /// # Errors
    ///
    /// Transport failure.
    pub fn ping(&mut self) -> NetworkResult<()> {
        self.sender.send_ping()
    }

    /// Runs one tick: drains inbound frames, handles clock traffic, then
    /// flushes local edits.
    ///
    /// # Errors
    ///
    /// Transport failure while answering a ping or flushing. Inbound
    /// problems are events, not errors.
    pub fn tick(&mut self) -> NetworkResult<Vec<ReceiverEvent>> {
        let events = self.receiver.drain(&mut self.registry);
        for event in &events {
            match *event {
                ReceiverEvent::PingReceived { client_id, time } if self.is_server => {
                    self.sender.send_pong(client_id, time)?;
                }
                ReceiverEvent::PongReceived { ping_time, .. } if !self.is_server => {
                    let rtt = self.clock.record_pong(self.sender.clock(), ping_time);
                    debug!("Round trip {} ticks", rtt);
                }
                ReceiverEvent::ClockSynced(server_time) if !self.is_server => {
                    if let Some(time) = self.clock.adjust(self.sender.clock(), server_time) {
                        debug!("Clock {} -> {}", self.sender.clock(), time);
                        self.sender.set_clock(time);
                    }
                }
                _ => {}
            }
        }
        self.sender.flush_updates()?;
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LoopbackTransport;
    use scenelink_protocol::parameter::POSITION;
    use scenelink_protocol::{ObjectId, ParameterValue, SceneNode};
    use scenelink_shared::Vec3;

    #[test]
    fn test_two_sessions_converge() {
        let config = SyncConfig::default();

        let (tx, _rx) = crossbeam_channel::unbounded();
        let placeholder = LoopbackTransport::new(InboundHandle::new(tx));
        let mut client = SyncSession::new(&config, placeholder);
        let mut server = SyncSession::server(&config, LoopbackTransport::new(client.inbound()));
        assert_ne!(client.participant_id(), server.participant_id());

        let mut graph = SceneGraph::new();
        graph.add_root(SceneNode::group("Cube").editable());
        server.publish_scene(&graph).unwrap();

        let events = client.tick().unwrap();
        assert!(matches!(events.as_slice(), [ReceiverEvent::SceneLoaded(_)]));
        assert_eq!(client.registry().len(), 1);

        let moved = ParameterValue::Vec3(Vec3::new(0.0, 1.0, 0.0));
        server.registry_mut().get_mut(ObjectId(1)).unwrap().set(POSITION, moved.clone()).unwrap();
        server.tick().unwrap();

        let events = client.tick().unwrap();
        assert!(matches!(events.as_slice(), [ReceiverEvent::ParameterApplied { .. }]));
        assert_eq!(client.registry().get(ObjectId(1)).unwrap().value(POSITION), Some(moved));
    }

    #[test]
    fn test_adopt_scene_frame_ignores_sender_id() {
        let config = SyncConfig::default();
        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut client = SyncSession::new(&config, LoopbackTransport::new(InboundHandle::new(tx)));

        let mut graph = SceneGraph::new();
        graph.add_root(SceneNode::group("Cube").editable());
        let package = SceneDataHandler::default().pack(&graph).unwrap();
        let frame = crate::sender::scene_frame(client.participant_id(), 0, &package);
        client.adopt_scene_frame(&frame).unwrap();
        assert_eq!(client.registry().len(), 1);

        let ping = Message::Ping {
            header: scenelink_protocol::MessageHeader {
                kind: scenelink_protocol::MessageKind::Ping,
                client_id: 1,
                time: 0,
            },
        };
        assert!(matches!(
            client.adopt_scene_frame(&ping.encode()),
            Err(crate::error::NetworkError::Sync(SyncError::Protocol(
                ProtocolError::UnexpectedMessageKind { actual: 3, .. }
            )))
        ));
    }
}
