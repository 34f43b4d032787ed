//! # Node Packer / Unpacker
//!
//! One node record on the wire:
//!
//! ```text
//! kind u8 | editable u8 | child_count u32
//! position 3×f32 | rotation 4×f32 | scale 3×f32
//! name (u32 len + bytes)
//! payload (depends on kind)
//! ```
//!
//! Payloads:
//!
//! ```text
//! Geo        geo_id i32 | material_id i32 | texture_id i32 | roughness f32 | color 4×f32
//! SkinnedGeo <Geo> | bind_poses f32[] | bound_center 3×f32 | bound_extents 3×f32 | bone_ids i32[]
//! Light      light_type u8 | color 3×f32 | intensity f32 | angle f32 | range f32
//! Camera     fov f32 | aspect f32 | near f32 | far f32 | focal_distance f32 | aperture f32
//! ```

use scenelink_shared::{Color, Quat, Vec3};

use super::node::{
    CameraData, GeoData, LightData, LightType, NodeKind, NodePayload, SceneNode, SkinnedGeoData,
};
use crate::codec::{ByteReader, ByteWriter};
use crate::error::{DecodeError, ProtocolError};

/// Smallest encoded node record: an unnamed group.
pub(crate) const MIN_NODE_SIZE: usize = 1 + 1 + 4 + 40 + 4;

/// Appends one node record.
///
/// # Errors
///
/// [`ProtocolError::LengthOverflow`] for a name or array past `u32::MAX`
/// elements.
pub fn pack_node(writer: &mut ByteWriter, node: &SceneNode) -> Result<(), ProtocolError> {
    writer.write_u8(node.kind() as u8);
    writer.write_bool(node.editable);
    writer.write_u32(node.child_count);
    writer.write_pod(&node.position);
    writer.write_pod(&node.rotation);
    writer.write_pod(&node.scale);
    writer.write_bytes(&node.name)?;

    match &node.payload {
        NodePayload::Group => {}
        NodePayload::Geo(geo) => write_geo(writer, geo),
        NodePayload::SkinnedGeo(skinned) => {
            write_geo(writer, &skinned.geo);
            writer.write_f32_array(&skinned.bind_poses)?;
            writer.write_pod(&skinned.bound_center);
            writer.write_pod(&skinned.bound_extents);
            writer.write_i32_array(&skinned.bone_ids)?;
        }
        NodePayload::Light(light) => {
            writer.write_u8(light.light_type as u8);
            for c in light.color {
                writer.write_f32(c);
            }
            writer.write_f32(light.intensity);
            writer.write_f32(light.angle);
            writer.write_f32(light.range);
        }
        NodePayload::Camera(camera) => {
            writer.write_f32(camera.fov);
            writer.write_f32(camera.aspect);
            writer.write_f32(camera.near);
            writer.write_f32(camera.far);
            writer.write_f32(camera.focal_distance);
            writer.write_f32(camera.aperture);
        }
    }
    Ok(())
}

fn write_geo(writer: &mut ByteWriter, geo: &GeoData) {
    writer.write_i32(geo.geo_id);
    writer.write_i32(geo.material_id);
    writer.write_i32(geo.texture_id);
    writer.write_f32(geo.roughness);
    writer.write_pod(&geo.color);
}

/// Decodes one node record from the start of `bytes`.
///
/// Returns the node and the number of bytes it occupied.
///
/// # Errors
///
/// [`DecodeError::Truncated`] on a short buffer,
/// [`DecodeError::InvalidValue`] on an unknown kind or light type.
pub fn unpack_node(bytes: &[u8]) -> Result<(SceneNode, usize), DecodeError> {
    let mut reader = ByteReader::new(bytes);
    let node = read_node(&mut reader)?;
    Ok((node, reader.position()))
}

/// Decodes one node record at the reader's position.
pub(crate) fn read_node(reader: &mut ByteReader<'_>) -> Result<SceneNode, DecodeError> {
    let tag = reader.read_u8()?;
    let kind = NodeKind::from_u8(tag)
        .ok_or(DecodeError::InvalidValue { field: "node kind", value: i64::from(tag) })?;
    let editable = reader.read_bool()?;
    let child_count = reader.read_u32()?;
    let position = reader.read_pod::<Vec3>()?;
    let rotation = reader.read_pod::<Quat>()?;
    let scale = reader.read_pod::<Vec3>()?;
    let name = reader.read_bytes()?;

    let payload = match kind {
        NodeKind::Group => NodePayload::Group,
        NodeKind::Geo => NodePayload::Geo(read_geo(reader)?),
        NodeKind::SkinnedGeo => NodePayload::SkinnedGeo(SkinnedGeoData {
            geo: read_geo(reader)?,
            bind_poses: reader.read_f32_array()?,
            bound_center: reader.read_pod()?,
            bound_extents: reader.read_pod()?,
            bone_ids: reader.read_i32_array()?,
        }),
        NodeKind::Light => {
            let raw = reader.read_u8()?;
            let light_type = LightType::from_u8(raw)
                .ok_or(DecodeError::InvalidValue { field: "light type", value: i64::from(raw) })?;
            NodePayload::Light(LightData {
                light_type,
                color: [reader.read_f32()?, reader.read_f32()?, reader.read_f32()?],
                intensity: reader.read_f32()?,
                angle: reader.read_f32()?,
                range: reader.read_f32()?,
            })
        }
        NodeKind::Camera => NodePayload::Camera(CameraData {
            fov: reader.read_f32()?,
            aspect: reader.read_f32()?,
            near: reader.read_f32()?,
            far: reader.read_f32()?,
            focal_distance: reader.read_f32()?,
            aperture: reader.read_f32()?,
        }),
    };

    Ok(SceneNode { name, position, rotation, scale, child_count, editable, payload })
}

fn read_geo(reader: &mut ByteReader<'_>) -> Result<GeoData, DecodeError> {
    Ok(GeoData {
        geo_id: reader.read_i32()?,
        material_id: reader.read_i32()?,
        texture_id: reader.read_i32()?,
        roughness: reader.read_f32()?,
        color: reader.read_pod::<Color>()?,
    })
}
