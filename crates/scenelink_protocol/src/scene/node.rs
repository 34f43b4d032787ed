//! Scene node records.
//!
//! A node is the shared base (name, transform, child count, editable flag)
//! plus one [`NodePayload`] variant. The payload set is closed: adding a
//! kind means touching the packer's single exhaustive `match`.

use scenelink_shared::{Color, Quat, Vec3};

/// Wire discriminant of a node record.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Plain transform node.
    Group = 0,
    /// Static mesh.
    Geo = 1,
    /// Light source.
    Light = 2,
    /// Camera.
    Camera = 3,
    /// Skinned mesh.
    SkinnedGeo = 4,
}

impl NodeKind {
    /// Maps a wire byte back to a kind.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Group),
            1 => Some(Self::Geo),
            2 => Some(Self::Light),
            3 => Some(Self::Camera),
            4 => Some(Self::SkinnedGeo),
            _ => None,
        }
    }
}

/// Light source type.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightType {
    /// Cone light.
    Spot = 0,
    /// Sun light, direction only.
    Directional = 1,
    /// Omni light.
    Point = 2,
    /// Area light.
    Area = 3,
}

impl LightType {
    /// Maps a wire byte back to a light type.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Spot),
            1 => Some(Self::Directional),
            2 => Some(Self::Point),
            3 => Some(Self::Area),
            _ => None,
        }
    }
}

/// Mesh-bearing node fields. Ids index the package side tables; −1 is none.
#[derive(Clone, Debug, PartialEq)]
pub struct GeoData {
    /// Index into the mesh table.
    pub geo_id: i32,
    /// Index into the material table.
    pub material_id: i32,
    /// Index into the texture table.
    pub texture_id: i32,
    /// Roughness override.
    pub roughness: f32,
    /// Base color override.
    pub color: Color,
}

impl Default for GeoData {
    fn default() -> Self {
        Self {
            geo_id: -1,
            material_id: -1,
            texture_id: -1,
            roughness: 0.5,
            color: Color::WHITE,
        }
    }
}

/// Skinned mesh fields on top of [`GeoData`].
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SkinnedGeoData {
    /// Mesh and material references.
    pub geo: GeoData,
    /// Inverse bind matrices, 16 floats per bone, column-major.
    pub bind_poses: Vec<f32>,
    /// Local bounds center.
    pub bound_center: Vec3,
    /// Local bounds half extents.
    pub bound_extents: Vec3,
    /// Flat node index of each bone, −1 for unmapped bones.
    pub bone_ids: Vec<i32>,
}

/// Light fields.
#[derive(Clone, Debug, PartialEq)]
pub struct LightData {
    /// Light type.
    pub light_type: LightType,
    /// RGB color.
    pub color: [f32; 3],
    /// Intensity, before the receiver's intensity factor.
    pub intensity: f32,
    /// Spot cone angle in degrees.
    pub angle: f32,
    /// Range, before the receiver's scene scale.
    pub range: f32,
}

impl Default for LightData {
    fn default() -> Self {
        Self {
            light_type: LightType::Point,
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            angle: 60.0,
            range: 10.0,
        }
    }
}

/// Camera fields.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraData {
    /// Vertical field of view in degrees.
    pub fov: f32,
    /// Width over height.
    pub aspect: f32,
    /// Near clip plane.
    pub near: f32,
    /// Far clip plane.
    pub far: f32,
    /// Focus distance.
    pub focal_distance: f32,
    /// Aperture (f-stop).
    pub aperture: f32,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            fov: 60.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            focal_distance: 1.0,
            aperture: 2.8,
        }
    }
}

/// Variant part of a node.
#[derive(Clone, Debug, PartialEq)]
pub enum NodePayload {
    /// Plain transform node.
    Group,
    /// Static mesh.
    Geo(GeoData),
    /// Skinned mesh.
    SkinnedGeo(SkinnedGeoData),
    /// Light source.
    Light(LightData),
    /// Camera.
    Camera(CameraData),
}

impl NodePayload {
    /// Wire discriminant.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Group => NodeKind::Group,
            Self::Geo(_) => NodeKind::Geo,
            Self::SkinnedGeo(_) => NodeKind::SkinnedGeo,
            Self::Light(_) => NodeKind::Light,
            Self::Camera(_) => NodeKind::Camera,
        }
    }

    /// Mesh references, for both static and skinned meshes.
    #[must_use]
    pub const fn geo(&self) -> Option<&GeoData> {
        match self {
            Self::Geo(geo) => Some(geo),
            Self::SkinnedGeo(skinned) => Some(&skinned.geo),
            _ => None,
        }
    }

    /// Mutable mesh references.
    pub fn geo_mut(&mut self) -> Option<&mut GeoData> {
        match self {
            Self::Geo(geo) => Some(geo),
            Self::SkinnedGeo(skinned) => Some(&mut skinned.geo),
            _ => None,
        }
    }
}

/// One record of the flat node list.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    /// Display name, raw bytes.
    pub name: Vec<u8>,
    /// Local position.
    pub position: Vec3,
    /// Local rotation.
    pub rotation: Quat,
    /// Local scale.
    pub scale: Vec3,
    /// Number of direct children following this record.
    pub child_count: u32,
    /// Whether receivers may edit this node.
    pub editable: bool,
    /// Variant fields.
    pub payload: NodePayload,
}

impl SceneNode {
    /// Creates a node with identity transform and no children.
    #[must_use]
    pub fn new(name: impl Into<Vec<u8>>, payload: NodePayload) -> Self {
        Self {
            name: name.into(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            child_count: 0,
            editable: false,
            payload,
        }
    }

    /// Plain transform node.
    #[must_use]
    pub fn group(name: impl Into<Vec<u8>>) -> Self {
        Self::new(name, NodePayload::Group)
    }

    /// Builder: sets the position.
    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Builder: sets the rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder: sets the scale.
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Builder: marks the node editable.
    #[must_use]
    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    /// Wire discriminant.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.payload.kind()
    }

    /// Name as text, lossy for non-UTF-8 bytes.
    #[must_use]
    pub fn name_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }
}
