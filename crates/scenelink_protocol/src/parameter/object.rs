//! Scene objects: the live, parameterized counterpart of an editable node.

use crossbeam_channel::Sender;
use scenelink_shared::{Color, Quat, Vec3};

use super::param::{AbstractParameter, ObjectId, Parameter, ParameterChange, ParameterId};
use super::value::{ParameterData, ParameterValue};
use crate::error::ApplyError;
use crate::scene::{CameraData, LightData, NodePayload, SceneNode};

/// Transform position.
pub const POSITION: ParameterId = ParameterId(0);
/// Transform rotation.
pub const ROTATION: ParameterId = ParameterId(1);
/// Transform scale.
pub const SCALE: ParameterId = ParameterId(2);

/// Light color.
pub const LIGHT_COLOR: ParameterId = ParameterId(3);
/// Light intensity.
pub const LIGHT_INTENSITY: ParameterId = ParameterId(4);
/// Light range.
pub const LIGHT_RANGE: ParameterId = ParameterId(5);
/// Spot cone angle.
pub const LIGHT_SPOT_ANGLE: ParameterId = ParameterId(6);

/// Camera field of view.
pub const CAMERA_FOV: ParameterId = ParameterId(3);
/// Camera aspect ratio.
pub const CAMERA_ASPECT: ParameterId = ParameterId(4);
/// Near clip plane.
pub const CAMERA_NEAR: ParameterId = ParameterId(5);
/// Far clip plane.
pub const CAMERA_FAR: ParameterId = ParameterId(6);
/// Focus distance.
pub const CAMERA_FOCAL_DISTANCE: ParameterId = ParameterId(7);
/// Aperture.
pub const CAMERA_APERTURE: ParameterId = ParameterId(8);

/// What kind of node an object was created from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    /// Transform-only object.
    Transform,
    /// Light with light parameters.
    Light,
    /// Camera with camera parameters.
    Camera,
}

/// A live scene object and its ordered parameter list.
#[derive(Debug)]
pub struct SceneObject {
    id: ObjectId,
    scene_id: u8,
    name: String,
    kind: ObjectKind,
    locked: bool,
    parameters: Vec<Box<dyn AbstractParameter>>,
}

impl SceneObject {
    /// Transform object at the origin.
    #[must_use]
    pub fn new(id: ObjectId, name: impl Into<String>) -> Self {
        Self::with_transform(id, name, Vec3::ZERO, Quat::IDENTITY, Vec3::ONE)
    }

    /// Transform object with the given pose.
    #[must_use]
    pub fn with_transform(
        id: ObjectId,
        name: impl Into<String>,
        position: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> Self {
        let mut object = Self {
            id,
            scene_id: 0,
            name: name.into(),
            kind: ObjectKind::Transform,
            locked: false,
            parameters: Vec::with_capacity(3),
        };
        object.add_parameter("position", position);
        object.add_parameter("rotation", rotation);
        object.add_parameter("scale", scale);
        object
    }

    /// Object for a decoded node: transform parameters, plus light or
    /// camera parameters for those payloads.
    ///
    /// `light` and `camera` override the payload values, so callers can
    /// pass settings-scaled data.
    #[must_use]
    pub fn from_node(
        id: ObjectId,
        node: &SceneNode,
        light: Option<LightData>,
        camera: Option<CameraData>,
    ) -> Self {
        let mut object =
            Self::with_transform(id, node.name_lossy(), node.position, node.rotation, node.scale);

        let light = light.or_else(|| match &node.payload {
            NodePayload::Light(l) => Some(l.clone()),
            _ => None,
        });
        let camera = camera.or_else(|| match &node.payload {
            NodePayload::Camera(c) => Some(c.clone()),
            _ => None,
        });

        if let Some(light) = light {
            object.kind = ObjectKind::Light;
            let [r, g, b] = light.color;
            object.add_parameter("color", Color::rgb(r, g, b));
            object.add_parameter("intensity", light.intensity);
            object.add_parameter("range", light.range);
            object.add_parameter("spot_angle", light.angle);
        } else if let Some(camera) = camera {
            object.kind = ObjectKind::Camera;
            object.add_parameter("fov", camera.fov);
            object.add_parameter("aspect", camera.aspect);
            object.add_parameter("near", camera.near);
            object.add_parameter("far", camera.far);
            object.add_parameter("focal_distance", camera.focal_distance);
            object.add_parameter("aperture", camera.aperture);
        }
        object
    }

    /// Builder: sets the scene id carried in update messages.
    #[must_use]
    pub fn in_scene(mut self, scene_id: u8) -> Self {
        self.scene_id = scene_id;
        self
    }

    /// Object id.
    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    /// Scene id.
    #[must_use]
    pub const fn scene_id(&self) -> u8 {
        self.scene_id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Object kind.
    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// True while another participant holds the edit lock.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Sets the lock flag.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Appends a distributed parameter; its id is its position.
    pub fn add_parameter<T: ParameterData>(&mut self, name: &str, value: T) -> ParameterId {
        let id = self.next_parameter_id();
        self.parameters.push(Box::new(Parameter::new(self.id, id, name, value)));
        id
    }

    /// Appends a parameter that never leaves this process.
    pub fn add_local_parameter<T: ParameterData>(&mut self, name: &str, value: T) -> ParameterId {
        let id = self.next_parameter_id();
        self.parameters.push(Box::new(Parameter::new(self.id, id, name, value).local()));
        id
    }

    fn next_parameter_id(&self) -> ParameterId {
        debug_assert!(self.parameters.len() < usize::from(u16::MAX));
        ParameterId(self.parameters.len() as u16)
    }

    /// Number of parameters.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Parameters in id order.
    pub fn parameters(&self) -> impl Iterator<Item = &dyn AbstractParameter> {
        self.parameters.iter().map(|p| &**p)
    }

    /// Parameter by id.
    #[must_use]
    pub fn parameter(&self, id: ParameterId) -> Option<&dyn AbstractParameter> {
        self.parameters.get(usize::from(id.0)).map(|p| &**p)
    }

    /// Parameter by name.
    #[must_use]
    pub fn parameter_by_name(&self, name: &str) -> Option<&dyn AbstractParameter> {
        self.parameters().find(|p| p.name() == name)
    }

    /// Typed access.
    #[must_use]
    pub fn typed<T: ParameterData>(&self, id: ParameterId) -> Option<&Parameter<T>> {
        self.parameters.get(usize::from(id.0))?.as_any().downcast_ref()
    }

    /// Typed mutable access.
    pub fn typed_mut<T: ParameterData>(&mut self, id: ParameterId) -> Option<&mut Parameter<T>> {
        self.parameters.get_mut(usize::from(id.0))?.as_any_mut().downcast_mut()
    }

    /// Current value of a parameter.
    #[must_use]
    pub fn value(&self, id: ParameterId) -> Option<ParameterValue> {
        self.parameter(id).map(|p| p.value())
    }

    fn slot_mut(&mut self, id: ParameterId) -> Result<&mut Box<dyn AbstractParameter>, ApplyError> {
        let object = self.id.0;
        self.parameters
            .get_mut(usize::from(id.0))
            .ok_or(ApplyError::UnknownParameter { object, parameter: id.0 })
    }

    /// Local edit: sets and notifies subscribers.
    ///
    /// # Errors
    ///
    /// Unknown parameter or type mismatch.
    pub fn set(&mut self, id: ParameterId, value: ParameterValue) -> Result<(), ApplyError> {
        self.slot_mut(id)?.set_value(value)
    }

    /// Remote update: same mutation as [`Self::set`] without notification.
    ///
    /// # Errors
    ///
    /// Unknown parameter or type mismatch.
    pub fn apply_silent(&mut self, id: ParameterId, value: ParameterValue) -> Result<(), ApplyError> {
        self.slot_mut(id)?.apply_silent(value)
    }

    /// Restores every parameter to its initial value, silently.
    pub fn reset_silent(&mut self) {
        for p in &mut self.parameters {
            p.reset_silent();
        }
    }

    /// Subscribes `tx` to every distributed parameter.
    pub fn subscribe_all(&mut self, tx: &Sender<ParameterChange>) {
        for p in self.parameters.iter_mut().filter(|p| p.is_distributed()) {
            p.subscribe_with(tx.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::LightType;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_transform_parameters() {
        let object = SceneObject::new(ObjectId(1), "Cube");
        assert_eq!(object.parameter_count(), 3);
        assert_eq!(object.parameter(POSITION).unwrap().name(), "position");
        assert_eq!(object.parameter(ROTATION).unwrap().name(), "rotation");
        assert_eq!(object.parameter(SCALE).unwrap().name(), "scale");
        assert_eq!(object.value(SCALE), Some(ParameterValue::Vec3(Vec3::ONE)));
    }

    #[test]
    fn test_light_parameters() {
        let node = SceneNode::new(
            "Sun",
            NodePayload::Light(LightData {
                light_type: LightType::Directional,
                intensity: 1.5,
                ..LightData::default()
            }),
        );
        let object = SceneObject::from_node(ObjectId(2), &node, None, None);
        assert_eq!(object.kind(), ObjectKind::Light);
        assert_eq!(object.value(LIGHT_INTENSITY), Some(ParameterValue::Float(1.5)));
        assert_eq!(object.parameter(LIGHT_SPOT_ANGLE).unwrap().name(), "spot_angle");
    }

    #[test]
    fn test_camera_parameters() {
        let node = SceneNode::new("Cam", NodePayload::Camera(CameraData::default()));
        let object = SceneObject::from_node(ObjectId(3), &node, None, None);
        assert_eq!(object.kind(), ObjectKind::Camera);
        assert_eq!(object.parameter_count(), 9);
        assert_eq!(object.value(CAMERA_APERTURE), Some(ParameterValue::Float(2.8)));
        assert_eq!(object.value(CAMERA_FOCAL_DISTANCE), Some(ParameterValue::Float(1.0)));
    }

    #[test]
    fn test_local_vs_silent() {
        let mut object = SceneObject::new(ObjectId(1), "Cube");
        let (tx, rx) = unbounded();
        object.subscribe_all(&tx);

        object.set(POSITION, ParameterValue::Vec3(Vec3::ONE)).unwrap();
        object.apply_silent(SCALE, ParameterValue::Vec3(Vec3::ONE * 2.0)).unwrap();

        let changes: Vec<_> = rx.try_iter().collect();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].parameter_id, POSITION);
        assert_eq!(object.typed::<Vec3>(SCALE).unwrap().value(), &(Vec3::ONE * 2.0));
    }

    #[test]
    fn test_local_parameter_not_subscribed() {
        let mut object = SceneObject::new(ObjectId(1), "Cube");
        let hidden = object.add_local_parameter("selected", false);
        let (tx, rx) = unbounded();
        object.subscribe_all(&tx);
        object.set(hidden, ParameterValue::Bool(true)).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unknown_parameter() {
        let mut object = SceneObject::new(ObjectId(4), "Cube");
        assert_eq!(
            object.apply_silent(ParameterId(40), ParameterValue::Int(1)),
            Err(ApplyError::UnknownParameter { object: 4, parameter: 40 })
        );
    }

    #[test]
    fn test_reset_silent() {
        let mut object = SceneObject::new(ObjectId(1), "Cube");
        object.typed_mut::<Vec3>(POSITION).unwrap().set_silent(Vec3::ONE);
        object.reset_silent();
        assert_eq!(object.value(POSITION), Some(ParameterValue::Vec3(Vec3::ZERO)));
    }
}
