//! # Scene Data Handler
//!
//! Packs an authoring [`SceneGraph`] into a scene package and unpacks a
//! package into [`SceneData`].
//!
//! ## Guarantees
//!
//! - Side tables are deduplicated by `Arc` identity; indices follow first use
//!   in pre-order.
//! - `unpack` is all-or-nothing: every section is decoded into locals and the
//!   result is only returned once the whole package validated.
//! - Floats round-trip bit-exact.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::graph::{NodeHandle, SceneGraph};
use super::node::{NodePayload, SceneNode};
use super::package::{
    CharacterPackage, MaterialPackage, MeshPackage, SceneHeader, TexturePackage,
};
use super::packer::{pack_node, read_node, MIN_NODE_SIZE};
use super::replay::{LoadSettings, NodeAssets, NodeContext, SceneConstructor};
use super::tree::SceneTree;
use crate::codec::{ByteReader, ByteWriter};
use crate::error::{DecodeError, ReferenceError, SyncResult};

/// A fully decoded scene package.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneData {
    /// Package header.
    pub header: SceneHeader,
    /// Material table.
    pub materials: Vec<MaterialPackage>,
    /// Texture table.
    pub textures: Vec<TexturePackage>,
    /// Mesh table.
    pub meshes: Vec<MeshPackage>,
    /// Character table.
    pub characters: Vec<CharacterPackage>,
    /// Flat pre-order node list.
    pub nodes: Vec<SceneNode>,
    /// Structure rebuilt from `nodes`.
    pub tree: SceneTree,
}

impl SceneData {
    /// Material of a mesh node. `None` for −1, non-mesh nodes, and
    /// out-of-range ids (the latter logged).
    #[must_use]
    pub fn material_for(&self, node: &SceneNode) -> Option<&MaterialPackage> {
        let geo = node.payload.geo()?;
        resolve(&self.materials, geo.material_id, "material")
    }

    /// Texture of a mesh node, same rules as [`Self::material_for`].
    #[must_use]
    pub fn texture_for(&self, node: &SceneNode) -> Option<&TexturePackage> {
        let geo = node.payload.geo()?;
        resolve(&self.textures, geo.texture_id, "texture")
    }

    /// Mesh data of a mesh node, same rules as [`Self::material_for`].
    #[must_use]
    pub fn mesh_for(&self, node: &SceneNode) -> Option<&MeshPackage> {
        let geo = node.payload.geo()?;
        resolve(&self.meshes, geo.geo_id, "mesh")
    }
}

fn resolve<'a, T>(table: &'a [T], id: i32, what: &'static str) -> Option<&'a T> {
    if id == -1 {
        return None;
    }
    let entry = usize::try_from(id).ok().and_then(|i| table.get(i));
    if entry.is_none() {
        warn!("{} id {} outside table of {}, treating as none", what, id, table.len());
    }
    entry
}

/// Identity-keyed side table.
struct AssetTable<T> {
    entries: Vec<Arc<T>>,
    index: HashMap<usize, i32>,
}

impl<T> AssetTable<T> {
    fn new() -> Self {
        Self { entries: Vec::new(), index: HashMap::new() }
    }

    fn register(&mut self, asset: Option<&Arc<T>>) -> i32 {
        let Some(asset) = asset else {
            return -1;
        };
        let key = Arc::as_ptr(asset) as usize;
        let next = self.entries.len() as i32;
        *self.index.entry(key).or_insert_with(|| {
            self.entries.push(Arc::clone(asset));
            next
        })
    }

    fn count(&self) -> u32 {
        self.entries.len() as u32
    }
}

/// Packs and unpacks scene packages.
#[derive(Clone, Debug, Default)]
pub struct SceneDataHandler {
    settings: LoadSettings,
}

impl SceneDataHandler {
    /// Creates a handler with the given receiver-side settings.
    #[must_use]
    pub const fn new(settings: LoadSettings) -> Self {
        Self { settings }
    }

    /// Settings used by [`Self::replay`].
    #[must_use]
    pub const fn settings(&self) -> &LoadSettings {
        &self.settings
    }

    /// Serializes a scene graph.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::UnknownNode`] if a bone or character handle is
    /// not reachable from the graph's roots;
    /// [`crate::ProtocolError::LengthOverflow`] for a field past the `u32`
    /// length prefix.
    pub fn pack(&self, graph: &SceneGraph) -> SyncResult<Vec<u8>> {
        let order = graph.pre_order();
        let mut flat_index = vec![None; graph.nodes.len()];
        for (flat, handle) in order.iter().enumerate() {
            flat_index[handle.index()] = Some(flat as i32);
        }
        let flat = |handle: NodeHandle| -> Result<i32, ReferenceError> {
            flat_index
                .get(handle.index())
                .copied()
                .flatten()
                .ok_or(ReferenceError::UnknownNode(handle.index()))
        };
        let flat_opt = |handle: Option<NodeHandle>| handle.map_or(Ok(-1), flat);

        let mut materials = AssetTable::new();
        let mut textures = AssetTable::new();
        let mut meshes = AssetTable::new();
        let mut node_bytes = ByteWriter::with_capacity(order.len() * 96);

        for handle in &order {
            let slot = &graph.nodes[handle.index()];
            let mut node = slot.node.clone();
            node.child_count = slot.children.len() as u32;

            if let Some(geo) = node.payload.geo_mut() {
                geo.material_id = materials.register(slot.material.as_ref());
                geo.texture_id = textures.register(slot.texture.as_ref());
                geo.geo_id = meshes.register(slot.mesh.as_ref());
            }
            if let NodePayload::SkinnedGeo(skinned) = &mut node.payload {
                skinned.bone_ids = slot
                    .bones
                    .iter()
                    .map(|bone| flat_opt(*bone))
                    .collect::<Result<_, _>>()?;
            }
            pack_node(&mut node_bytes, &node)?;
        }

        let mut characters = Vec::with_capacity(graph.characters.len());
        for rig in &graph.characters {
            characters.push(CharacterPackage {
                root_id: flat(rig.root)?,
                bone_mapping: rig.bone_mapping.iter().map(|b| flat_opt(*b)).collect::<Result<_, _>>()?,
                skeleton_mapping: rig
                    .skeleton_mapping
                    .iter()
                    .map(|b| flat_opt(*b))
                    .collect::<Result<_, _>>()?,
                bone_position: rig.bone_position.clone(),
                bone_rotation: rig.bone_rotation.clone(),
                bone_scale: rig.bone_scale.clone(),
            });
        }

        let mut header = SceneHeader::new(graph.texture_binary_type);
        header.node_count = order.len() as u32;
        header.object_count = meshes.count();
        header.texture_count = textures.count();
        header.material_count = materials.count();
        header.character_count = characters.len() as u32;
        header.root_child_count = graph.roots.len() as u32;

        let mut writer = ByteWriter::with_capacity(SceneHeader::SIZE + node_bytes.len());
        writer.write_pod(&header);
        for material in &materials.entries {
            material.write(&mut writer)?;
        }
        for texture in &textures.entries {
            texture.write(&mut writer)?;
        }
        for mesh in &meshes.entries {
            mesh.write(&mut writer)?;
        }
        for character in &characters {
            character.write(&mut writer)?;
        }
        writer.write_raw(node_bytes.as_slice());

        debug!(
            "Packed scene: {} nodes, {} meshes, {} materials, {} textures, {} bytes",
            header.node_count,
            header.object_count,
            header.material_count,
            header.texture_count,
            writer.len()
        );
        Ok(writer.into_bytes())
    }

    /// Decodes and validates a scene package.
    ///
    /// # Errors
    ///
    /// - [`DecodeError`] for bad magic/version, truncation, section counts
    ///   that do not match the records present, trailing bytes, or child
    ///   counts that do not form a tree.
    /// - [`ReferenceError::CharacterRoot`] for a character whose root is not
    ///   a node.
    pub fn unpack(&self, bytes: &[u8]) -> SyncResult<SceneData> {
        let mut reader = ByteReader::new(bytes);
        let header = SceneHeader::read(&mut reader)?;

        let materials = read_section(
            &mut reader,
            ("materials", header.material_count, MaterialPackage::MIN_SIZE),
            MaterialPackage::read,
        )?;
        let textures = read_section(
            &mut reader,
            ("textures", header.texture_count, TexturePackage::MIN_SIZE),
            TexturePackage::read,
        )?;
        let meshes = read_section(
            &mut reader,
            ("meshes", header.object_count, MeshPackage::MIN_SIZE),
            MeshPackage::read,
        )?;
        let characters = read_section(
            &mut reader,
            ("characters", header.character_count, CharacterPackage::MIN_SIZE),
            CharacterPackage::read,
        )?;
        let nodes = read_section(&mut reader, ("nodes", header.node_count, MIN_NODE_SIZE), read_node)?;

        if !reader.is_exhausted() {
            return Err(surplus_records(reader, header.node_count).into());
        }

        let tree = SceneTree::build(&nodes, header.root_child_count)?;

        for (i, character) in characters.iter().enumerate() {
            let in_range = usize::try_from(character.root_id).is_ok_and(|root| root < nodes.len());
            if !in_range {
                return Err(ReferenceError::CharacterRoot {
                    character: i,
                    root_id: character.root_id,
                    node_count: nodes.len(),
                }
                .into());
            }
        }

        debug!("Unpacked scene: {} nodes from {} bytes", nodes.len(), bytes.len());
        Ok(SceneData { header, materials, textures, meshes, characters, nodes, tree })
    }

    /// Hands every node of `scene` to `constructor`, parents first, then
    /// every character.
    ///
    /// # Errors
    ///
    /// The first error returned by the constructor; construction stops there.
    pub fn replay<C>(&self, scene: &SceneData, constructor: &mut C) -> Result<Vec<C::Handle>, C::Error>
    where
        C: SceneConstructor,
        C::Error: From<ReferenceError>,
    {
        let mut handles: Vec<C::Handle> = Vec::with_capacity(scene.nodes.len());

        for (index, node) in scene.nodes.iter().enumerate() {
            let parent = scene.tree.parent(index).and_then(|p| handles.get(p));
            let assets = NodeAssets {
                material: scene.material_for(node),
                texture: if self.settings.load_textures { scene.texture_for(node) } else { None },
                mesh: scene.mesh_for(node),
            };
            let handle = constructor.create_node(NodeContext {
                index,
                node,
                parent,
                assets,
                settings: self.settings,
            })?;
            handles.push(handle);
        }

        for (i, character) in scene.characters.iter().enumerate() {
            let root = usize::try_from(character.root_id)
                .ok()
                .and_then(|r| handles.get(r))
                .ok_or(ReferenceError::CharacterRoot {
                    character: i,
                    root_id: character.root_id,
                    node_count: handles.len(),
                })?;
            constructor.create_character(character, root)?;
        }

        Ok(handles)
    }
}

/// Reads `declared` records of at least `min_size` bytes each. Running out
/// of bytes exactly on a record boundary is a count mismatch; mid-record it
/// is plain truncation.
fn read_section<T>(
    reader: &mut ByteReader<'_>,
    (section, declared, min_size): (&'static str, u32, usize),
    read: impl Fn(&mut ByteReader<'_>) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    let mut records = Vec::with_capacity(section_capacity(declared, reader.remaining(), min_size));
    for decoded in 0..declared {
        if reader.is_exhausted() {
            return Err(DecodeError::CountMismatch { section, declared, decoded });
        }
        records.push(read(reader)?);
    }
    Ok(records)
}

/// Records a section can hold at most, given the bytes left. Bounds the
/// up-front allocation whatever the header claims.
fn section_capacity(declared: u32, remaining: usize, min_size: usize) -> usize {
    (declared as usize).min(remaining / min_size.max(1))
}

/// Classifies bytes left after the last declared node: whole extra node
/// records are a count mismatch, anything else is trailing garbage.
fn surplus_records(mut reader: ByteReader<'_>, declared: u32) -> DecodeError {
    let leftover = reader.remaining();
    let mut extra = 0u32;
    while !reader.is_exhausted() {
        if read_node(&mut reader).is_err() {
            return DecodeError::TrailingBytes(leftover);
        }
        extra += 1;
    }
    DecodeError::CountMismatch { section: "nodes", declared, decoded: declared + extra }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::node::{GeoData, LightData, LightType};
    use crate::scene::package::PACKAGE_MAGIC;

    fn cube_and_sun() -> SceneGraph {
        let mut graph = SceneGraph::new();
        let cube = graph.add_root(SceneNode::new("Cube", NodePayload::Geo(GeoData::default())));
        graph.set_material(cube, Arc::new(MaterialPackage::resource("Default", "Standard"))).unwrap();
        graph.set_mesh(cube, Arc::new(MeshPackage::default())).unwrap();
        graph.add_root(SceneNode::new(
            "Sun",
            NodePayload::Light(LightData {
                light_type: LightType::Directional,
                intensity: 1.5,
                ..LightData::default()
            }),
        ));
        graph
    }

    #[test]
    fn test_pack_unpack_cube_and_sun() {
        let handler = SceneDataHandler::default();
        let bytes = handler.pack(&cube_and_sun()).unwrap();
        let scene = handler.unpack(&bytes).unwrap();

        assert_eq!(scene.header.magic, PACKAGE_MAGIC);
        assert_eq!(scene.nodes.len(), 2);
        assert_eq!(scene.header.object_count, 1);
        assert_eq!(scene.header.root_child_count, 2);
        assert_eq!(scene.nodes[0].name, b"Cube");
        assert_eq!(scene.nodes[0].payload.geo().unwrap().material_id, 0);
        match &scene.nodes[1].payload {
            NodePayload::Light(light) => {
                assert_eq!(light.light_type, LightType::Directional);
                assert_eq!(light.intensity, 1.5);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_material_dedupe() {
        let shared = Arc::new(MaterialPackage::shader("Metal", "pbr"));
        let mut graph = SceneGraph::new();
        let parent = graph.add_root(SceneNode::group("parent"));
        for i in 0..3 {
            let h = graph
                .add_child(parent, SceneNode::new(format!("geo{i}"), NodePayload::Geo(GeoData::default())))
                .unwrap();
            graph.set_material(h, Arc::clone(&shared)).unwrap();
        }
        // Equal contents, distinct identity: its own entry.
        let other = graph.add_root(SceneNode::new("other", NodePayload::Geo(GeoData::default())));
        graph.set_material(other, Arc::new(MaterialPackage::shader("Metal", "pbr"))).unwrap();

        let handler = SceneDataHandler::default();
        let scene = handler.unpack(&handler.pack(&graph).unwrap()).unwrap();
        assert_eq!(scene.materials.len(), 2);
        let ids: Vec<i32> = scene
            .nodes
            .iter()
            .filter_map(|n| n.payload.geo().map(|g| g.material_id))
            .collect();
        assert_eq!(ids, vec![0, 0, 0, 1]);
    }

    #[test]
    fn test_missing_material_is_none() {
        let mut graph = SceneGraph::new();
        graph.add_root(SceneNode::new("bare", NodePayload::Geo(GeoData::default())));
        let handler = SceneDataHandler::default();
        let scene = handler.unpack(&handler.pack(&graph).unwrap()).unwrap();
        assert_eq!(scene.nodes[0].payload.geo().unwrap().material_id, -1);
        assert!(scene.material_for(&scene.nodes[0]).is_none());
    }

    #[test]
    fn test_out_of_range_optional_reference_is_none() {
        let handler = SceneDataHandler::default();
        let mut scene = handler.unpack(&handler.pack(&cube_and_sun()).unwrap()).unwrap();
        scene.nodes[0].payload.geo_mut().unwrap().material_id = 7;
        assert!(scene.material_for(&scene.nodes[0]).is_none());
    }

    #[test]
    fn test_truncated_package_fails() {
        let handler = SceneDataHandler::default();
        let bytes = handler.pack(&cube_and_sun()).unwrap();
        for cut in [0, 10, SceneHeader::SIZE, bytes.len() - 1] {
            assert!(handler.unpack(&bytes[..cut]).is_err(), "cut at {cut}");
        }
    }

    #[test]
    fn test_node_count_too_high() {
        let handler = SceneDataHandler::default();
        let mut bytes = handler.pack(&cube_and_sun()).unwrap();
        // node_count lives at offset 8.
        bytes[8..12].copy_from_slice(&3u32.to_le_bytes());
        assert_eq!(
            handler.unpack(&bytes).unwrap_err(),
            DecodeError::CountMismatch { section: "nodes", declared: 3, decoded: 2 }.into()
        );
    }

    #[test]
    fn test_node_count_too_low() {
        let handler = SceneDataHandler::default();
        let mut bytes = handler.pack(&cube_and_sun()).unwrap();
        bytes[8..12].copy_from_slice(&1u32.to_le_bytes());
        assert_eq!(
            handler.unpack(&bytes).unwrap_err(),
            DecodeError::CountMismatch { section: "nodes", declared: 1, decoded: 2 }.into()
        );
    }

    #[test]
    fn test_section_capacity_bounded_by_record_size() {
        let filler = 1 << 20;
        assert_eq!(section_capacity(u32::MAX, filler, MIN_NODE_SIZE), filler / MIN_NODE_SIZE);
        assert_eq!(section_capacity(3, filler, MIN_NODE_SIZE), 3);
        assert_eq!(section_capacity(u32::MAX, 0, MeshPackage::MIN_SIZE), 0);
    }

    #[test]
    fn test_huge_node_count_with_filler_fails() {
        let mut header = SceneHeader::new(crate::scene::package::TextureBinaryType::Image);
        header.node_count = u32::MAX;
        let mut writer = ByteWriter::new();
        writer.write_pod(&header);
        writer.write_raw(&vec![0u8; 1 << 20]);

        let err = SceneDataHandler::default().unpack(writer.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::SyncError::Decode(DecodeError::Truncated { .. } | DecodeError::CountMismatch { .. })
        ));
    }

    #[test]
    fn test_trailing_garbage() {
        let handler = SceneDataHandler::default();
        let mut bytes = handler.pack(&cube_and_sun()).unwrap();
        bytes.extend_from_slice(&[0xFF, 0xFF, 0xFF]);
        assert_eq!(handler.unpack(&bytes).unwrap_err(), DecodeError::TrailingBytes(3).into());
    }

    #[test]
    fn test_character_root_out_of_range() {
        let mut graph = SceneGraph::new();
        let root = graph.add_root(SceneNode::group("hips"));
        graph.add_character(crate::scene::graph::CharacterRig::new(root)).unwrap();
        let handler = SceneDataHandler::default();
        let mut bytes = handler.pack(&graph).unwrap();

        // First character record starts right after the header (no other tables).
        let at = SceneHeader::SIZE;
        bytes[at..at + 4].copy_from_slice(&5i32.to_le_bytes());
        assert_eq!(
            handler.unpack(&bytes).unwrap_err(),
            ReferenceError::CharacterRoot { character: 0, root_id: 5, node_count: 1 }.into()
        );
    }
}
