//! # Sender Role
//!
//! Frames outgoing traffic for one participant.
//!
//! ```text
//! Parameter::set ──▶ change channel ──flush_updates()──▶ ParameterUpdate frames ──▶ Transport
//! ```
//!
//! Records leave in the order their changes were made. A frame is closed
//! before it would exceed the frame limit; a single record larger than the
//! limit still goes out alone.

use crossbeam_channel::{unbounded, Receiver, Sender};
use scenelink_protocol::{Message, MessageHeader, MessageKind, ObjectId, ParameterChange, UpdateMessage};
use scenelink_shared::MAX_UPDATE_FRAME;
use tracing::{debug, warn};

use crate::error::NetworkResult;
use crate::transport::Transport;

/// Sender counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// Update records sent.
    pub updates_sent: u64,
    /// Update frames sent.
    pub update_frames: u64,
    /// Changes dropped because they could not be encoded.
    pub updates_dropped: u64,
    /// Scene packages sent.
    pub packages_sent: u64,
    /// Lock, reset, sync and ping frames sent.
    pub control_frames: u64,
}

/// Outbound half of a participant.
pub struct SceneSender<T: Transport> {
    transport: T,
    client_id: u8,
    scene_id: u8,
    clock: u8,
    changes_tx: Sender<ParameterChange>,
    changes_rx: Receiver<ParameterChange>,
    max_frame: usize,
    stats: SenderStats,
}

impl<T: Transport> SceneSender<T> {
    /// Creates a sender for `client_id` over `transport`.
    pub fn new(transport: T, client_id: u8, scene_id: u8) -> Self {
        let (changes_tx, changes_rx) = unbounded();
        Self {
            transport,
            client_id,
            scene_id,
            clock: 0,
            changes_tx,
            changes_rx,
            max_frame: MAX_UPDATE_FRAME,
            stats: SenderStats::default(),
        }
    }

    /// Builder: frame size limit for parameter updates.
    #[must_use]
    pub fn with_max_frame(mut self, max_frame: usize) -> Self {
        self.max_frame = max_frame;
        self
    }

    /// Channel to subscribe parameters to. Pass it to
    /// [`crate::SceneRegistry::set_change_sink`].
    #[must_use]
    pub fn change_sink(&self) -> Sender<ParameterChange> {
        self.changes_tx.clone()
    }

    /// This participant's id.
    #[must_use]
    pub const fn client_id(&self) -> u8 {
        self.client_id
    }

    /// Current clock value stamped on frames.
    #[must_use]
    pub const fn clock(&self) -> u8 {
        self.clock
    }

    /// Sets the clock, e.g. after a sync frame.
    pub fn set_clock(&mut self, time: u8) {
        self.clock = time;
    }

    /// Advances the clock by one, wrapping.
    pub fn advance_clock(&mut self) {
        self.clock = self.clock.wrapping_add(1);
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> SenderStats {
        self.stats
    }

    /// The underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// The underlying transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn header(&self, kind: MessageKind) -> MessageHeader {
        MessageHeader { kind, client_id: self.client_id, time: self.clock }
    }

    /// Sends a full scene package.
    ///
    /// # Errors
    ///
    /// Transport failure.
    pub fn send_scene(&mut self, package: &[u8]) -> NetworkResult<()> {
        let frame = scene_frame(self.client_id, self.clock, package);
        self.transport.send(&frame)?;
        self.stats.packages_sent += 1;
        debug!("Sent scene package: {} bytes", package.len());
        Ok(())
    }

    /// Drains pending parameter changes into update frames. Returns the
    /// number of records sent.
    ///
    /// # Errors
    ///
    /// Transport failure. Records of the failed frame are lost; later
    /// changes stay queued for the next flush.
    pub fn flush_updates(&mut self) -> NetworkResult<usize> {
        let header = self.header(MessageKind::ParameterUpdate);
        let mut batch: Vec<UpdateMessage> = Vec::new();
        let mut batch_len = MessageHeader::SIZE;
        let mut sent = 0;

        while let Ok(change) = self.changes_rx.try_recv() {
            let record = match UpdateMessage::from_change(self.scene_id, &change) {
                Ok(record) => record,
                Err(e) => {
                    self.stats.updates_dropped += 1;
                    warn!(
                        "Dropping change of object {} parameter {}: {}",
                        change.object_id, change.parameter_id, e
                    );
                    continue;
                }
            };

            if !batch.is_empty() && batch_len + record.encoded_len() > self.max_frame {
                sent += self.send_batch(header, &mut batch)?;
                batch_len = MessageHeader::SIZE;
            }
            batch_len += record.encoded_len();
            batch.push(record);
        }

        if !batch.is_empty() {
            sent += self.send_batch(header, &mut batch)?;
        }
        Ok(sent)
    }

    fn send_batch(&mut self, header: MessageHeader, batch: &mut Vec<UpdateMessage>) -> NetworkResult<usize> {
        let updates = std::mem::take(batch);
        let count = updates.len();
        let frame = Message::ParameterUpdate { header, updates }.encode();
        self.transport.send(&frame)?;
        self.stats.update_frames += 1;
        self.stats.updates_sent += count as u64;
        Ok(count)
    }

    fn send_control(&mut self, message: &Message) -> NetworkResult<()> {
        self.transport.send(&message.encode())?;
        self.stats.control_frames += 1;
        Ok(())
    }

    /// Announces an edit lock change.
    ///
    /// # Errors
    ///
    /// Transport failure.
    pub fn send_lock(&mut self, object_id: ObjectId, locked: bool) -> NetworkResult<()> {
        let message = Message::Lock {
            header: self.header(MessageKind::Lock),
            scene_id: self.scene_id,
            object_id,
            locked,
        };
        self.send_control(&message)
    }

    /// Asks receivers to restore an object's initial values.
    ///
    /// # Errors
    ///
    /// Transport failure.
    pub fn send_reset(&mut self, object_id: ObjectId) -> NetworkResult<()> {
        let message = Message::ResetObject {
            header: self.header(MessageKind::ResetObject),
            scene_id: self.scene_id,
            object_id,
        };
        self.send_control(&message)
    }

    /// Broadcasts the current clock.
    ///
    /// # Errors
    ///
    /// Transport failure.
    pub fn send_sync(&mut self) -> NetworkResult<()> {
        let message = Message::Sync { header: self.header(MessageKind::Sync) };
        self.send_control(&message)
    }

    /// Sends a liveness ping.
    ///
    /// # Errors
    ///
    /// Transport failure.
    pub fn send_ping(&mut self) -> NetworkResult<()> {
        let message = Message::Ping { header: self.header(MessageKind::Ping) };
        self.send_control(&message)
    }

    /// Answers a ping from `target` that carried `ping_time`.
    ///
    /// # Errors
    ///
    /// Transport failure.
    pub fn send_pong(&mut self, target: u8, ping_time: u8) -> NetworkResult<()> {
        let message = Message::Pong { header: self.header(MessageKind::Pong), target, ping_time };
        self.send_control(&message)
    }
}

/// Encodes a scene package frame.
#[must_use]
pub fn scene_frame(client_id: u8, time: u8, package: &[u8]) -> Vec<u8> {
    Message::ScenePackage {
        header: MessageHeader { kind: MessageKind::ScenePackage, client_id, time },
        package: package.to_vec(),
    }
    .encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{InboundHandle, LoopbackTransport};
    use scenelink_protocol::parameter::POSITION;
    use scenelink_protocol::{ParameterId, ParameterValue, SceneObject};
    use scenelink_shared::Vec3;

    fn sender(max_frame: usize) -> (SceneSender<LoopbackTransport>, Receiver<Vec<u8>>) {
        let (tx, rx) = unbounded();
        let transport = LoopbackTransport::new(InboundHandle::new(tx));
        (SceneSender::new(transport, 4, 0).with_max_frame(max_frame), rx)
    }

    fn records(frame: &[u8]) -> Vec<UpdateMessage> {
        match Message::decode(frame).unwrap() {
            Message::ParameterUpdate { updates, .. } => updates,
            other => panic!("unexpected {:?}", other.kind()),
        }
    }

    #[test]
    fn test_flush_keeps_change_order() {
        let (mut sender, rx) = sender(MAX_UPDATE_FRAME);
        let mut object = SceneObject::new(ObjectId(1), "Cube");
        object.subscribe_all(&sender.change_sink());

        for x in [1.0, 2.0, 3.0] {
            object.set(POSITION, ParameterValue::Vec3(Vec3::new(x, 0.0, 0.0))).unwrap();
        }
        assert_eq!(sender.flush_updates().unwrap(), 3);

        let frame = rx.try_recv().unwrap();
        assert_eq!(&frame[..2], &[0, 4]);
        let xs: Vec<_> = records(&frame)
            .iter()
            .map(|r| match r.value().unwrap() {
                ParameterValue::Vec3(v) => v.x,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
        assert!(rx.try_recv().is_err());
        assert_eq!(sender.flush_updates().unwrap(), 0);
    }

    #[test]
    fn test_flush_splits_frames() {
        // Header plus two 20-byte records.
        let (mut sender, rx) = sender(MessageHeader::SIZE + 40);
        let mut object = SceneObject::new(ObjectId(1), "Cube");
        object.subscribe_all(&sender.change_sink());
        for i in 0..5 {
            object.set(POSITION, ParameterValue::Vec3(Vec3::new(i as f32, 0.0, 0.0))).unwrap();
        }
        assert_eq!(sender.flush_updates().unwrap(), 5);

        let sizes: Vec<_> = rx.try_iter().map(|f| records(&f).len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(sender.stats().update_frames, 3);
    }

    #[test]
    fn test_local_parameter_not_sent() {
        let (mut sender, rx) = sender(MAX_UPDATE_FRAME);
        let mut object = SceneObject::new(ObjectId(1), "Cube");
        let local = object.add_local_parameter("selected", false);
        object.subscribe_all(&sender.change_sink());
        object.set(local, ParameterValue::Bool(true)).unwrap();
        assert_eq!(sender.flush_updates().unwrap(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_control_frames() {
        let (mut sender, rx) = sender(MAX_UPDATE_FRAME);
        sender.set_clock(255);
        sender.advance_clock();
        sender.send_lock(ObjectId(2), true).unwrap();
        sender.send_reset(ObjectId(2)).unwrap();
        sender.send_sync().unwrap();
        sender.send_ping().unwrap();
        sender.send_pong(9, 3).unwrap();
        sender.send_scene(&[1, 2, 3]).unwrap();

        let kinds: Vec<_> = rx
            .try_iter()
            .map(|f| {
                let message = Message::decode(&f).unwrap();
                assert_eq!(message.header().time, 0);
                message.kind()
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                MessageKind::Lock,
                MessageKind::ResetObject,
                MessageKind::Sync,
                MessageKind::Ping,
                MessageKind::Pong,
                MessageKind::ScenePackage
            ]
        );
        assert_eq!(sender.stats().control_frames, 5);
        assert_eq!(sender.stats().packages_sent, 1);
    }

    #[test]
    fn test_records_carry_parameter_ids() {
        let (mut sender, rx) = sender(MAX_UPDATE_FRAME);
        let mut object = SceneObject::new(ObjectId(7), "Lamp");
        let intensity = object.add_parameter("intensity", 1.0f32);
        object.subscribe_all(&sender.change_sink());
        object.set(intensity, ParameterValue::Float(2.0)).unwrap();
        sender.flush_updates().unwrap();

        let record = &records(&rx.try_recv().unwrap())[0];
        assert_eq!(record.object_id, ObjectId(7));
        assert_eq!(record.parameter_id, ParameterId(3));
        assert_eq!(record.value().unwrap(), ParameterValue::Float(2.0));
    }
}
