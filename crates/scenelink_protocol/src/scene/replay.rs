//! Scene construction seam.
//!
//! The handler walks a decoded package in pre-order and hands each node to a
//! [`SceneConstructor`]. Engine-side objects are the constructor's business;
//! the protocol side only guarantees parents are created before children.

use super::node::{CameraData, LightData, NodePayload, SceneNode};
use super::package::{CharacterPackage, MaterialPackage, MeshPackage, TexturePackage};

/// Receiver-side load options. Never part of the wire format.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadSettings {
    /// Resolve textures. When false every node gets `texture: None`.
    pub load_textures: bool,
    /// Multiplier applied to light intensity.
    pub light_intensity_factor: f32,
    /// Multiplier applied to light range and camera clip planes.
    pub scene_scale: f32,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self { load_textures: true, light_intensity_factor: 1.0, scene_scale: 1.0 }
    }
}

/// Side-table entries a node refers to. `None` is an explicit "no asset".
#[derive(Clone, Copy, Debug, Default)]
pub struct NodeAssets<'a> {
    /// Material, if any.
    pub material: Option<&'a MaterialPackage>,
    /// Texture, if any and if textures are loaded.
    pub texture: Option<&'a TexturePackage>,
    /// Mesh data, if any.
    pub mesh: Option<&'a MeshPackage>,
}

/// Everything a constructor gets for one node.
#[derive(Debug)]
pub struct NodeContext<'a, H> {
    /// Flat index.
    pub index: usize,
    /// Decoded record, unscaled.
    pub node: &'a SceneNode,
    /// Handle returned for the parent, `None` under the scene root.
    pub parent: Option<&'a H>,
    /// Resolved side-table entries.
    pub assets: NodeAssets<'a>,
    /// Settings in effect.
    pub settings: LoadSettings,
}

impl<H> NodeContext<'_, H> {
    /// Light fields with intensity and range scaled by the load settings.
    #[must_use]
    pub fn light(&self) -> Option<LightData> {
        match &self.node.payload {
            NodePayload::Light(light) => Some(LightData {
                intensity: light.intensity * self.settings.light_intensity_factor,
                range: light.range * self.settings.scene_scale,
                ..light.clone()
            }),
            _ => None,
        }
    }

    /// Camera fields with clip planes scaled by the load settings.
    #[must_use]
    pub fn camera(&self) -> Option<CameraData> {
        match &self.node.payload {
            NodePayload::Camera(camera) => Some(CameraData {
                near: camera.near * self.settings.scene_scale,
                far: camera.far * self.settings.scene_scale,
                ..camera.clone()
            }),
            _ => None,
        }
    }
}

/// Builds engine objects from a decoded scene.
pub trait SceneConstructor {
    /// Engine-side object handle.
    type Handle;
    /// Construction failure.
    type Error;

    /// Creates one node. Called in flat order; parents come first.
    fn create_node(&mut self, ctx: NodeContext<'_, Self::Handle>)
        -> Result<Self::Handle, Self::Error>;

    /// Creates one character after all nodes exist.
    fn create_character(
        &mut self,
        _character: &CharacterPackage,
        _root: &Self::Handle,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::node::LightType;

    #[test]
    fn test_light_scaling() {
        let node = SceneNode::new(
            "sun",
            NodePayload::Light(LightData {
                light_type: LightType::Directional,
                intensity: 1.5,
                range: 4.0,
                ..LightData::default()
            }),
        );
        let ctx: NodeContext<'_, ()> = NodeContext {
            index: 0,
            node: &node,
            parent: None,
            assets: NodeAssets::default(),
            settings: LoadSettings { light_intensity_factor: 2.0, scene_scale: 0.5, ..LoadSettings::default() },
        };
        let light = ctx.light().unwrap();
        assert_eq!(light.intensity, 3.0);
        assert_eq!(light.range, 2.0);
        assert!(ctx.camera().is_none());
        // The record itself is untouched.
        assert!(matches!(&node.payload, NodePayload::Light(l) if l.intensity == 1.5));
    }
}
