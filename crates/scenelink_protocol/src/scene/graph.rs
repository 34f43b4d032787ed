//! Authoring-side scene graph.
//!
//! Nodes live in an arena and refer to each other by [`NodeHandle`].
//! Assets are attached as `Arc`s; the packer deduplicates them by pointer
//! identity, so sharing one `Arc<MaterialPackage>` between ten nodes yields
//! one material entry.

use std::sync::Arc;

use super::node::SceneNode;
use super::package::{MaterialPackage, MeshPackage, TextureBinaryType, TexturePackage};
use crate::error::ReferenceError;

/// Index of a node in a [`SceneGraph`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(usize);

impl NodeHandle {
    /// Arena slot.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Arena slot: the node plus its links and attachments.
#[derive(Clone, Debug)]
pub(crate) struct GraphNode {
    pub(crate) node: SceneNode,
    pub(crate) children: Vec<NodeHandle>,
    pub(crate) material: Option<Arc<MaterialPackage>>,
    pub(crate) texture: Option<Arc<TexturePackage>>,
    pub(crate) mesh: Option<Arc<MeshPackage>>,
    pub(crate) bones: Vec<Option<NodeHandle>>,
}

/// Skeleton description in graph handles.
#[derive(Clone, Debug, PartialEq)]
pub struct CharacterRig {
    /// Character root node.
    pub root: NodeHandle,
    /// Node per humanoid bone slot.
    pub bone_mapping: Vec<Option<NodeHandle>>,
    /// Node per skeleton joint.
    pub skeleton_mapping: Vec<Option<NodeHandle>>,
    /// Rest positions, 3 floats per joint.
    pub bone_position: Vec<f32>,
    /// Rest rotations, 4 floats per joint.
    pub bone_rotation: Vec<f32>,
    /// Rest scales, 3 floats per joint.
    pub bone_scale: Vec<f32>,
}

impl CharacterRig {
    /// Rig with no bones.
    #[must_use]
    pub const fn new(root: NodeHandle) -> Self {
        Self {
            root,
            bone_mapping: Vec::new(),
            skeleton_mapping: Vec::new(),
            bone_position: Vec::new(),
            bone_rotation: Vec::new(),
            bone_scale: Vec::new(),
        }
    }
}

/// Scene graph under an implicit root.
///
/// `child_count` on the stored nodes is ignored; the packer derives it from
/// the arena links.
#[derive(Clone, Debug, Default)]
pub struct SceneGraph {
    pub(crate) nodes: Vec<GraphNode>,
    pub(crate) roots: Vec<NodeHandle>,
    pub(crate) characters: Vec<CharacterRig>,
    pub(crate) texture_binary_type: TextureBinaryType,
}

impl SceneGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how textures in this graph are encoded.
    #[must_use]
    pub fn with_texture_binary_type(mut self, texture_binary_type: TextureBinaryType) -> Self {
        self.texture_binary_type = texture_binary_type;
        self
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level nodes, in insertion order.
    #[must_use]
    pub fn roots(&self) -> &[NodeHandle] {
        &self.roots
    }

    /// Adds a node directly under the scene root.
    pub fn add_root(&mut self, node: SceneNode) -> NodeHandle {
        let handle = self.push(node);
        self.roots.push(handle);
        handle
    }

    /// Adds a node as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::UnknownNode`] if `parent` is not in this graph.
    pub fn add_child(
        &mut self,
        parent: NodeHandle,
        node: SceneNode,
    ) -> Result<NodeHandle, ReferenceError> {
        self.slot(parent)?;
        let handle = self.push(node);
        self.nodes[parent.0].children.push(handle);
        Ok(handle)
    }

    /// Node stored at `handle`.
    #[must_use]
    pub fn node(&self, handle: NodeHandle) -> Option<&SceneNode> {
        self.nodes.get(handle.0).map(|slot| &slot.node)
    }

    /// Mutable node stored at `handle`.
    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut SceneNode> {
        self.nodes.get_mut(handle.0).map(|slot| &mut slot.node)
    }

    /// Children of `handle`, in order.
    #[must_use]
    pub fn children(&self, handle: NodeHandle) -> &[NodeHandle] {
        self.nodes.get(handle.0).map_or(&[], |slot| slot.children.as_slice())
    }

    /// Attaches a material to a mesh node.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::UnknownNode`] if `handle` is not in this graph.
    pub fn set_material(
        &mut self,
        handle: NodeHandle,
        material: Arc<MaterialPackage>,
    ) -> Result<(), ReferenceError> {
        self.slot_mut(handle)?.material = Some(material);
        Ok(())
    }

    /// Attaches a texture to a mesh node.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::UnknownNode`] if `handle` is not in this graph.
    pub fn set_texture(
        &mut self,
        handle: NodeHandle,
        texture: Arc<TexturePackage>,
    ) -> Result<(), ReferenceError> {
        self.slot_mut(handle)?.texture = Some(texture);
        Ok(())
    }

    /// Attaches mesh data to a mesh node.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::UnknownNode`] if `handle` is not in this graph.
    pub fn set_mesh(
        &mut self,
        handle: NodeHandle,
        mesh: Arc<MeshPackage>,
    ) -> Result<(), ReferenceError> {
        self.slot_mut(handle)?.mesh = Some(mesh);
        Ok(())
    }

    /// Sets the bones of a skinned mesh node, one entry per bone slot.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::UnknownNode`] if `handle` or any bone is not in
    /// this graph.
    pub fn set_bones(
        &mut self,
        handle: NodeHandle,
        bones: Vec<Option<NodeHandle>>,
    ) -> Result<(), ReferenceError> {
        for bone in bones.iter().flatten() {
            self.slot(*bone)?;
        }
        self.slot_mut(handle)?.bones = bones;
        Ok(())
    }

    /// Registers a character rig.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::UnknownNode`] if the root or any mapped bone is not
    /// in this graph.
    pub fn add_character(&mut self, rig: CharacterRig) -> Result<(), ReferenceError> {
        self.slot(rig.root)?;
        for bone in rig.bone_mapping.iter().chain(&rig.skeleton_mapping).flatten() {
            self.slot(*bone)?;
        }
        self.characters.push(rig);
        Ok(())
    }

    fn push(&mut self, node: SceneNode) -> NodeHandle {
        let handle = NodeHandle(self.nodes.len());
        self.nodes.push(GraphNode {
            node,
            children: Vec::new(),
            material: None,
            texture: None,
            mesh: None,
            bones: Vec::new(),
        });
        handle
    }

    fn slot(&self, handle: NodeHandle) -> Result<&GraphNode, ReferenceError> {
        self.nodes.get(handle.0).ok_or(ReferenceError::UnknownNode(handle.0))
    }

    fn slot_mut(&mut self, handle: NodeHandle) -> Result<&mut GraphNode, ReferenceError> {
        self.nodes.get_mut(handle.0).ok_or(ReferenceError::UnknownNode(handle.0))
    }

    /// Handles in pre-order: each node before its children, siblings in
    /// insertion order.
    pub(crate) fn pre_order(&self) -> Vec<NodeHandle> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeHandle> = self.roots.iter().rev().copied().collect();
        while let Some(handle) = stack.pop() {
            order.push(handle);
            stack.extend(self.nodes[handle.0].children.iter().rev().copied());
        }
        order
    }
}
