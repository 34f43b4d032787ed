//! # Scene Package Layout
//!
//! ```text
//! ┌──────────────┐
//! │ SceneHeader  │  32 bytes, Pod
//! ├──────────────┤
//! │ materials    │  header.material_count records
//! │ textures     │  header.texture_count records
//! │ meshes       │  header.object_count records
//! │ characters   │  header.character_count records
//! │ nodes        │  header.node_count records, pre-order
//! └──────────────┘
//! ```
//!
//! Side-table records are written by the functions in this module; node
//! records by [`super::packer`].

use bytemuck::{Pod, Zeroable};

use crate::codec::{ByteReader, ByteWriter};
use crate::error::{DecodeError, ProtocolError};

/// Package magic, `SLNK` little-endian.
pub const PACKAGE_MAGIC: u32 = u32::from_le_bytes(*b"SLNK");

/// Current package format version.
pub const PACKAGE_VERSION: u16 = 1;

/// How texture payloads are encoded.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TextureBinaryType {
    /// Compressed image container (PNG, JPEG, ...).
    #[default]
    Image = 0,
    /// Raw pixel data in the texture's declared format.
    Raw = 1,
}

impl TextureBinaryType {
    /// Maps a wire byte back to a binary type.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Image),
            1 => Some(Self::Raw),
            _ => None,
        }
    }
}

/// Fixed-size package header.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct SceneHeader {
    /// Always [`PACKAGE_MAGIC`].
    pub magic: u32,
    /// Format version.
    pub version: u16,
    /// [`TextureBinaryType`] as a byte.
    pub texture_binary_type: u8,
    /// Reserved, zero.
    pub reserved: u8,
    /// Node records.
    pub node_count: u32,
    /// Mesh records.
    pub object_count: u32,
    /// Texture records.
    pub texture_count: u32,
    /// Material records.
    pub material_count: u32,
    /// Character records.
    pub character_count: u32,
    /// Children of the implicit scene root.
    pub root_child_count: u32,
}

impl SceneHeader {
    /// Size in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Header for an empty package.
    #[must_use]
    pub const fn new(texture_binary_type: TextureBinaryType) -> Self {
        Self {
            magic: PACKAGE_MAGIC,
            version: PACKAGE_VERSION,
            texture_binary_type: texture_binary_type as u8,
            reserved: 0,
            node_count: 0,
            object_count: 0,
            texture_count: 0,
            material_count: 0,
            character_count: 0,
            root_child_count: 0,
        }
    }

    /// Reads and validates a header.
    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let header: Self = reader.read_pod()?;
        if header.magic != PACKAGE_MAGIC {
            return Err(DecodeError::BadMagic(header.magic));
        }
        if header.version != PACKAGE_VERSION {
            return Err(DecodeError::UnsupportedVersion(header.version));
        }
        if TextureBinaryType::from_u8(header.texture_binary_type).is_none() {
            return Err(DecodeError::InvalidValue {
                field: "texture binary type",
                value: i64::from(header.texture_binary_type),
            });
        }
        Ok(header)
    }

    /// Texture encoding declared by this header.
    #[must_use]
    pub fn texture_binary_type(&self) -> TextureBinaryType {
        TextureBinaryType::from_u8(self.texture_binary_type).unwrap_or_default()
    }
}

/// Where a material's definition comes from.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaterialKind {
    /// Engine resource looked up by name.
    Resource = 1,
    /// Shader looked up by name.
    Shader = 2,
}

/// Material side-table entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaterialPackage {
    /// Lookup strategy.
    pub kind: MaterialKind,
    /// Material name.
    pub name: Vec<u8>,
    /// Resource path or shader name.
    pub src: Vec<u8>,
}

impl MaterialPackage {
    /// Smallest encoded record: kind plus two empty strings.
    pub(crate) const MIN_SIZE: usize = 4 + 4 + 4;

    /// Material resolved from an engine resource.
    #[must_use]
    pub fn resource(name: impl Into<Vec<u8>>, src: impl Into<Vec<u8>>) -> Self {
        Self { kind: MaterialKind::Resource, name: name.into(), src: src.into() }
    }

    /// Material resolved from a shader.
    #[must_use]
    pub fn shader(name: impl Into<Vec<u8>>, src: impl Into<Vec<u8>>) -> Self {
        Self { kind: MaterialKind::Shader, name: name.into(), src: src.into() }
    }

    pub(crate) fn write(&self, writer: &mut ByteWriter) -> Result<(), ProtocolError> {
        writer.write_i32(self.kind as i32);
        writer.write_bytes(&self.name)?;
        writer.write_bytes(&self.src)
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let kind = match reader.read_i32()? {
            1 => MaterialKind::Resource,
            2 => MaterialKind::Shader,
            other => {
                return Err(DecodeError::InvalidValue {
                    field: "material kind",
                    value: i64::from(other),
                })
            }
        };
        Ok(Self { kind, name: reader.read_bytes()?, src: reader.read_bytes()? })
    }
}

/// Texture side-table entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TexturePackage {
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
    /// Engine pixel format id, meaningful for raw textures.
    pub format: i32,
    /// Encoded image or raw pixels.
    pub color_map_data: Vec<u8>,
}

impl TexturePackage {
    /// Smallest encoded record: three ints plus empty data.
    pub(crate) const MIN_SIZE: usize = 4 * 3 + 4;

    pub(crate) fn write(&self, writer: &mut ByteWriter) -> Result<(), ProtocolError> {
        writer.write_i32(self.width);
        writer.write_i32(self.height);
        writer.write_i32(self.format);
        writer.write_bytes(&self.color_map_data)
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            width: reader.read_i32()?,
            height: reader.read_i32()?,
            format: reader.read_i32()?,
            color_map_data: reader.read_bytes()?,
        })
    }
}

/// Mesh side-table entry.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct MeshPackage {
    /// Positions, 3 floats per vertex.
    pub vertices: Vec<f32>,
    /// Normals, 3 floats per vertex.
    pub normals: Vec<f32>,
    /// Texture coordinates, 2 floats per vertex.
    pub uvs: Vec<f32>,
    /// Triangle indices.
    pub indices: Vec<i32>,
    /// Skin weights, 4 per vertex. Empty for static meshes.
    pub bone_weights: Vec<f32>,
    /// Skin bone slots, 4 per vertex. Empty for static meshes.
    pub bone_indices: Vec<i32>,
}

impl MeshPackage {
    /// Smallest encoded record: six empty arrays.
    pub(crate) const MIN_SIZE: usize = 6 * 4;

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub(crate) fn write(&self, writer: &mut ByteWriter) -> Result<(), ProtocolError> {
        writer.write_f32_array(&self.vertices)?;
        writer.write_f32_array(&self.normals)?;
        writer.write_f32_array(&self.uvs)?;
        writer.write_i32_array(&self.indices)?;
        writer.write_f32_array(&self.bone_weights)?;
        writer.write_i32_array(&self.bone_indices)
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let mesh = Self {
            vertices: reader.read_f32_array()?,
            normals: reader.read_f32_array()?,
            uvs: reader.read_f32_array()?,
            indices: reader.read_i32_array()?,
            bone_weights: reader.read_f32_array()?,
            bone_indices: reader.read_i32_array()?,
        };
        check_stride("mesh vertices", mesh.vertices.len(), 3)?;
        check_stride("mesh normals", mesh.normals.len(), 3)?;
        check_stride("mesh uvs", mesh.uvs.len(), 2)?;
        check_stride("mesh bone weights", mesh.bone_weights.len(), 4)?;
        check_stride("mesh bone indices", mesh.bone_indices.len(), 4)?;
        if mesh.bone_weights.len() != mesh.bone_indices.len() {
            return Err(DecodeError::InvalidValue {
                field: "mesh bone index count",
                value: mesh.bone_indices.len() as i64,
            });
        }
        Ok(mesh)
    }
}

/// Character (skeleton) side-table entry.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CharacterPackage {
    /// Flat node index of the character root. Required.
    pub root_id: i32,
    /// Flat node index per humanoid bone slot, −1 for unmapped.
    pub bone_mapping: Vec<i32>,
    /// Flat node index per skeleton joint.
    pub skeleton_mapping: Vec<i32>,
    /// Rest positions, 3 floats per joint.
    pub bone_position: Vec<f32>,
    /// Rest rotations, 4 floats per joint.
    pub bone_rotation: Vec<f32>,
    /// Rest scales, 3 floats per joint.
    pub bone_scale: Vec<f32>,
}

impl CharacterPackage {
    /// Smallest encoded record: root id plus five empty arrays.
    pub(crate) const MIN_SIZE: usize = 4 + 5 * 4;

    pub(crate) fn write(&self, writer: &mut ByteWriter) -> Result<(), ProtocolError> {
        writer.write_i32(self.root_id);
        writer.write_i32_array(&self.bone_mapping)?;
        writer.write_i32_array(&self.skeleton_mapping)?;
        writer.write_f32_array(&self.bone_position)?;
        writer.write_f32_array(&self.bone_rotation)?;
        writer.write_f32_array(&self.bone_scale)
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let character = Self {
            root_id: reader.read_i32()?,
            bone_mapping: reader.read_i32_array()?,
            skeleton_mapping: reader.read_i32_array()?,
            bone_position: reader.read_f32_array()?,
            bone_rotation: reader.read_f32_array()?,
            bone_scale: reader.read_f32_array()?,
        };
        check_stride("character bone positions", character.bone_position.len(), 3)?;
        check_stride("character bone rotations", character.bone_rotation.len(), 4)?;
        check_stride("character bone scales", character.bone_scale.len(), 3)?;
        Ok(character)
    }
}

fn check_stride(field: &'static str, len: usize, stride: usize) -> Result<(), DecodeError> {
    if len % stride == 0 {
        Ok(())
    } else {
        Err(DecodeError::InvalidValue { field, value: len as i64 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        assert_eq!(SceneHeader::SIZE, 32);
    }

    #[test]
    fn test_header_validation() {
        let mut header = SceneHeader::new(TextureBinaryType::Raw);
        header.magic = 0xDEAD_BEEF;
        let mut w = ByteWriter::new();
        w.write_pod(&header);
        let bytes = w.into_bytes();
        assert_eq!(
            SceneHeader::read(&mut ByteReader::new(&bytes)),
            Err(DecodeError::BadMagic(0xDEAD_BEEF))
        );

        let mut header = SceneHeader::new(TextureBinaryType::Raw);
        header.version = 99;
        let mut w = ByteWriter::new();
        w.write_pod(&header);
        let bytes = w.into_bytes();
        assert_eq!(
            SceneHeader::read(&mut ByteReader::new(&bytes)),
            Err(DecodeError::UnsupportedVersion(99))
        );
    }

    #[test]
    fn test_material_kind_rejected() {
        let mut w = ByteWriter::new();
        w.write_i32(7);
        w.write_bytes(b"m").unwrap();
        w.write_bytes(b"").unwrap();
        let bytes = w.into_bytes();
        assert_eq!(
            MaterialPackage::read(&mut ByteReader::new(&bytes)),
            Err(DecodeError::InvalidValue { field: "material kind", value: 7 })
        );
    }

    #[test]
    fn test_mesh_stride_checked() {
        let mesh = MeshPackage { vertices: vec![0.0; 4], ..MeshPackage::default() };
        let mut w = ByteWriter::new();
        mesh.write(&mut w).unwrap();
        let bytes = w.into_bytes();
        assert!(matches!(
            MeshPackage::read(&mut ByteReader::new(&bytes)),
            Err(DecodeError::InvalidValue { field: "mesh vertices", .. })
        ));
    }

    #[test]
    fn test_skinned_mesh_record() {
        let mesh = MeshPackage {
            vertices: vec![0.0; 6],
            normals: vec![0.0; 6],
            uvs: vec![0.0; 4],
            indices: vec![0, 1, 0],
            bone_weights: vec![1.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0],
            bone_indices: vec![0, 0, 0, 0, 0, 1, 0, 0],
        };
        let mut w = ByteWriter::new();
        mesh.write(&mut w).unwrap();
        let bytes = w.into_bytes();
        let decoded = MeshPackage::read(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(decoded.vertex_count(), 2);
        assert_eq!(decoded, mesh);
    }
}
