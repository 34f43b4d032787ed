//! # Scene Object Registry
//!
//! Owns the live [`SceneObject`]s of one participant, indexed by
//! [`ObjectId`]. Ids are assigned densely from 1, so lookup is a slice index.

use std::collections::HashMap;

use crossbeam_channel::Sender;
use scenelink_protocol::scene::{NodeContext, NodeKind};
use scenelink_protocol::{
    ApplyError, ObjectId, ParameterChange, SceneConstructor, SceneData, SceneDataHandler,
    SceneObject, SyncError, SyncResult, UpdateMessage,
};
use tracing::{debug, warn};

/// Live objects of one scene.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    scene_id: u8,
    objects: Vec<SceneObject>,
    node_objects: HashMap<usize, ObjectId>,
    change_sink: Option<Sender<ParameterChange>>,
}

impl SceneRegistry {
    /// Creates an empty registry for `scene_id`.
    #[must_use]
    pub fn new(scene_id: u8) -> Self {
        Self { scene_id, ..Self::default() }
    }

    /// Scene id stamped on created objects.
    #[must_use]
    pub const fn scene_id(&self) -> u8 {
        self.scene_id
    }

    /// Routes local edits of every object, present and future, to `tx`.
    pub fn set_change_sink(&mut self, tx: Sender<ParameterChange>) {
        for object in &mut self.objects {
            object.subscribe_all(&tx);
        }
        self.change_sink = Some(tx);
    }

    /// Creates an object with the next free id. `None` once ids run out.
    pub fn insert(&mut self, build: impl FnOnce(ObjectId) -> SceneObject) -> Option<ObjectId> {
        let id = ObjectId(u16::try_from(self.objects.len() + 1).ok()?);
        let mut object = build(id);
        if let Some(tx) = &self.change_sink {
            object.subscribe_all(tx);
        }
        self.objects.push(object);
        Some(id)
    }

    /// Looks up an object.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        usize::from(id.0).checked_sub(1).and_then(|i| self.objects.get(i))
    }

    /// Looks up an object for mutation.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        usize::from(id.0).checked_sub(1).and_then(|i| self.objects.get_mut(i))
    }

    /// Number of objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if there are no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects in id order.
    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    /// Object created for flat node `index`, if any.
    #[must_use]
    pub fn object_for_node(&self, index: usize) -> Option<ObjectId> {
        self.node_objects.get(&index).copied()
    }

    /// Rejects records addressed to another scene.
    ///
    /// # Errors
    ///
    /// [`ApplyError::WrongScene`].
    pub const fn check_scene(&self, scene_id: u8) -> Result<(), ApplyError> {
        if scene_id == self.scene_id {
            Ok(())
        } else {
            Err(ApplyError::WrongScene { expected: self.scene_id, actual: scene_id })
        }
    }

    /// Applies a remote update with the silent set.
    ///
    /// # Errors
    ///
    /// A record for another scene, an unknown object or parameter, a bad
    /// value encoding, or a type mismatch. Nothing is changed on error.
    pub fn apply(&mut self, update: &UpdateMessage) -> SyncResult<()> {
        self.check_scene(update.scene_id)?;
        let value = update.value()?;
        let object = self
            .get_mut(update.object_id)
            .ok_or(ApplyError::UnknownObject(update.object_id.0))?;
        object.apply_silent(update.parameter_id, value)?;
        Ok(())
    }

    /// Sets an object's edit lock.
    ///
    /// # Errors
    ///
    /// [`ApplyError::UnknownObject`].
    pub fn set_locked(&mut self, id: ObjectId, locked: bool) -> Result<(), ApplyError> {
        let object = self.get_mut(id).ok_or(ApplyError::UnknownObject(id.0))?;
        object.set_locked(locked);
        Ok(())
    }

    /// Restores an object's initial values without notifying.
    ///
    /// # Errors
    ///
    /// [`ApplyError::UnknownObject`].
    pub fn reset_object(&mut self, id: ObjectId) -> Result<(), ApplyError> {
        let object = self.get_mut(id).ok_or(ApplyError::UnknownObject(id.0))?;
        object.reset_silent();
        Ok(())
    }

    /// Drops every object. Their subscriptions disconnect with them.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.node_objects.clear();
    }

    /// Replaces the registry contents with objects for `scene`. The new
    /// objects are built aside and swapped in only once replay succeeds.
    ///
    /// # Errors
    ///
    /// A character whose root is out of range. The previous contents stay.
    pub fn load_scene(
        &mut self,
        handler: &SceneDataHandler,
        scene: &SceneData,
    ) -> SyncResult<Vec<Option<ObjectId>>> {
        let mut fresh = Self {
            scene_id: self.scene_id,
            change_sink: self.change_sink.clone(),
            ..Self::default()
        };
        let handles = handler.replay(scene, &mut RegistryBuilder { registry: &mut fresh })?;
        *self = fresh;
        debug!(
            "Scene {} loaded: {} nodes, {} objects",
            self.scene_id,
            handles.len(),
            self.objects.len()
        );
        Ok(handles)
    }
}

/// [`SceneConstructor`] that creates a [`SceneObject`] for every editable
/// node and every light or camera.
pub struct RegistryBuilder<'a> {
    registry: &'a mut SceneRegistry,
}

impl<'a> RegistryBuilder<'a> {
    /// Builds into `registry`.
    pub fn new(registry: &'a mut SceneRegistry) -> Self {
        Self { registry }
    }
}

impl SceneConstructor for RegistryBuilder<'_> {
    type Handle = Option<ObjectId>;
    type Error = SyncError;

    fn create_node(&mut self, ctx: NodeContext<'_, Self::Handle>) -> Result<Self::Handle, SyncError> {
        let live = ctx.node.editable || matches!(ctx.node.kind(), NodeKind::Light | NodeKind::Camera);
        if !live {
            return Ok(None);
        }

        let scene_id = self.registry.scene_id;
        let (light, camera) = (ctx.light(), ctx.camera());
        let id = self.registry.insert(|id| {
            SceneObject::from_node(id, ctx.node, light, camera).in_scene(scene_id)
        });
        match id {
            Some(id) => {
                self.registry.node_objects.insert(ctx.index, id);
            }
            None => warn!("Object ids exhausted; node {} has no live object", ctx.index),
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use scenelink_protocol::scene::{CharacterPackage, GeoData, LightData, LightType, NodePayload};
    use scenelink_protocol::parameter::{LIGHT_INTENSITY, POSITION};
    use scenelink_protocol::{LoadSettings, ParameterId, ParameterValue, SceneGraph, SceneNode};
    use scenelink_shared::Vec3;

    fn scene() -> (SceneDataHandler, SceneData) {
        let mut graph = SceneGraph::new();
        let root = graph.add_root(SceneNode::group("root"));
        graph
            .add_child(root, SceneNode::new("Cube", NodePayload::Geo(GeoData::default())).editable())
            .unwrap();
        graph
            .add_child(root, SceneNode::new("Static", NodePayload::Geo(GeoData::default())))
            .unwrap();
        graph
            .add_child(
                root,
                SceneNode::new(
                    "Sun",
                    NodePayload::Light(LightData {
                        light_type: LightType::Directional,
                        intensity: 1.5,
                        ..LightData::default()
                    }),
                ),
            )
            .unwrap();
        let handler = SceneDataHandler::new(LoadSettings {
            light_intensity_factor: 2.0,
            ..LoadSettings::default()
        });
        let bytes = handler.pack(&graph).unwrap();
        let data = handler.unpack(&bytes).unwrap();
        (handler, data)
    }

    #[test]
    fn test_load_scene_creates_live_objects() {
        let (handler, data) = scene();
        let mut registry = SceneRegistry::new(3);
        let handles = registry.load_scene(&handler, &data).unwrap();

        assert_eq!(handles, vec![None, Some(ObjectId(1)), None, Some(ObjectId(2))]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.object_for_node(3), Some(ObjectId(2)));

        let sun = registry.get(ObjectId(2)).unwrap();
        assert_eq!(sun.name(), "Sun");
        assert_eq!(sun.scene_id(), 3);
        assert_eq!(sun.value(LIGHT_INTENSITY), Some(ParameterValue::Float(3.0)));
    }

    #[test]
    fn test_apply_is_silent() {
        let (handler, data) = scene();
        let mut registry = SceneRegistry::new(0);
        let (tx, rx) = unbounded();
        registry.set_change_sink(tx);
        registry.load_scene(&handler, &data).unwrap();

        let value = ParameterValue::Vec3(Vec3::new(1.0, 2.0, 3.0));
        let update = UpdateMessage::new(0, ObjectId(1), POSITION, &value).unwrap();
        registry.apply(&update).unwrap();
        registry.apply(&update).unwrap();

        assert_eq!(registry.get(ObjectId(1)).unwrap().value(POSITION), Some(value));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_apply_errors() {
        let (handler, data) = scene();
        let mut registry = SceneRegistry::new(0);
        registry.load_scene(&handler, &data).unwrap();

        let value = ParameterValue::Float(1.0);
        let unknown = UpdateMessage::new(0, ObjectId(9), POSITION, &value).unwrap();
        assert!(matches!(
            registry.apply(&unknown),
            Err(SyncError::Apply(ApplyError::UnknownObject(9)))
        ));

        let wrong_type = UpdateMessage::new(0, ObjectId(1), POSITION, &value).unwrap();
        assert!(matches!(
            registry.apply(&wrong_type),
            Err(SyncError::Apply(ApplyError::TypeMismatch { .. }))
        ));

        let no_param = UpdateMessage::new(0, ObjectId(1), ParameterId(40), &value).unwrap();
        assert!(matches!(
            registry.apply(&no_param),
            Err(SyncError::Apply(ApplyError::UnknownParameter { .. }))
        ));
    }

    #[test]
    fn test_apply_rejects_other_scene() {
        let (handler, data) = scene();
        let mut registry = SceneRegistry::new(0);
        registry.load_scene(&handler, &data).unwrap();

        let value = ParameterValue::Vec3(Vec3::ONE);
        let foreign = UpdateMessage::new(4, ObjectId(1), POSITION, &value).unwrap();
        assert_eq!(
            registry.apply(&foreign),
            Err(SyncError::Apply(ApplyError::WrongScene { expected: 0, actual: 4 }))
        );
        assert_eq!(
            registry.get(ObjectId(1)).unwrap().value(POSITION),
            Some(ParameterValue::Vec3(Vec3::ZERO))
        );
    }

    #[test]
    fn test_failed_load_keeps_previous_scene() {
        let (handler, data) = scene();
        let mut registry = SceneRegistry::new(0);
        let (tx, rx) = unbounded();
        registry.set_change_sink(tx);
        registry.load_scene(&handler, &data).unwrap();

        let mut broken = data.clone();
        broken.characters.push(CharacterPackage { root_id: 99, ..CharacterPackage::default() });
        assert!(matches!(
            registry.load_scene(&handler, &broken),
            Err(SyncError::Reference(_))
        ));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.object_for_node(3), Some(ObjectId(2)));
        assert_eq!(registry.get(ObjectId(2)).unwrap().name(), "Sun");

        let value = ParameterValue::Vec3(Vec3::ONE);
        registry.get_mut(ObjectId(1)).unwrap().set(POSITION, value).unwrap();
        assert_eq!(rx.try_recv().unwrap().object_id, ObjectId(1));
    }

    #[test]
    fn test_local_edit_reaches_sink() {
        let mut registry = SceneRegistry::new(0);
        let (tx, rx) = unbounded();
        let id = registry.insert(|id| SceneObject::new(id, "a")).unwrap();
        registry.set_change_sink(tx);

        let value = ParameterValue::Vec3(Vec3::ONE);
        registry.get_mut(id).unwrap().set(POSITION, value.clone()).unwrap();
        let change = rx.try_recv().unwrap();
        assert_eq!(change.object_id, id);
        assert_eq!(change.value, value);
    }

    #[test]
    fn test_lock_and_reset() {
        let mut registry = SceneRegistry::new(0);
        let id = registry.insert(|id| SceneObject::new(id, "a")).unwrap();
        registry.set_locked(id, true).unwrap();
        assert!(registry.get(id).unwrap().is_locked());

        let moved = ParameterValue::Vec3(Vec3::new(4.0, 0.0, 0.0));
        registry.get_mut(id).unwrap().apply_silent(POSITION, moved).unwrap();
        registry.reset_object(id).unwrap();
        assert_eq!(
            registry.get(id).unwrap().value(POSITION),
            Some(ParameterValue::Vec3(Vec3::ZERO))
        );
        assert!(registry.reset_object(ObjectId(5)).is_err());
    }

    #[test]
    fn test_clear_disconnects() {
        let mut registry = SceneRegistry::new(0);
        let id = registry.insert(|id| SceneObject::new(id, "a")).unwrap();
        let rx = registry
            .get_mut(id)
            .unwrap()
            .typed_mut::<Vec3>(POSITION)
            .unwrap()
            .subscribe();
        registry.clear();
        assert!(registry.is_empty());
        assert!(matches!(rx.try_recv(), Err(crossbeam_channel::TryRecvError::Disconnected)));
    }
}
