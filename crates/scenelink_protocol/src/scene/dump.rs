//! Textual scene dumps.
//!
//! A dump is a TOML document holding the package as base64 plus a readable
//! summary. Loading a dump goes through [`SceneDataHandler::unpack`], so a
//! dump is exactly as trustworthy as the wire.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use scenelink_shared::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::handler::{SceneData, SceneDataHandler};
use crate::error::SyncError;

/// Format marker written into every dump.
pub const DUMP_FORMAT: &str = "scenelink-scene";

/// Dump failures.
#[derive(Error, Debug)]
pub enum DumpError {
    /// Not valid TOML or missing fields.
    #[error("dump parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Serialization failed.
    #[error("dump write error: {0}")]
    Write(#[from] toml::ser::Error),
    /// Package field is not valid base64.
    #[error("dump package is not base64: {0}")]
    Base64(#[from] base64::DecodeError),
    /// Format marker is missing or wrong.
    #[error("not a scene dump: format {0:?}")]
    Format(String),
    /// Embedded package failed to decode.
    #[error(transparent)]
    Scene(#[from] SyncError),
}

/// On-disk dump document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneDump {
    /// Always [`DUMP_FORMAT`].
    pub format: String,
    /// Package bytes, base64.
    pub package: String,
    /// Human-readable overview. Ignored on load.
    pub summary: DumpSummary,
}

/// Readable overview of a dumped package.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DumpSummary {
    /// Node records.
    pub nodes: u32,
    /// Mesh records.
    pub meshes: u32,
    /// Material records.
    pub materials: u32,
    /// Texture records.
    pub textures: u32,
    /// Character records.
    pub characters: u32,
    /// One entry per node, pre-order.
    pub outline: Vec<OutlineEntry>,
}

/// One node in a dump outline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutlineEntry {
    /// Node name, indented two spaces per tree level.
    pub name: String,
    /// Node kind.
    pub kind: String,
    /// Local position.
    pub position: Vec3,
    /// Local rotation.
    pub rotation: Quat,
    /// Local scale.
    pub scale: Vec3,
}

impl DumpSummary {
    fn of(scene: &SceneData) -> Self {
        let outline = scene
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| OutlineEntry {
                name: format!("{}{}", "  ".repeat(scene.tree.depth(i)), node.name_lossy()),
                kind: format!("{:?}", node.kind()),
                position: node.position,
                rotation: node.rotation,
                scale: node.scale,
            })
            .collect();
        Self {
            nodes: scene.header.node_count,
            meshes: scene.header.object_count,
            materials: scene.header.material_count,
            textures: scene.header.texture_count,
            characters: scene.header.character_count,
            outline,
        }
    }
}

/// Renders a package as a TOML dump. The package is validated first.
///
/// # Errors
///
/// [`DumpError::Scene`] if the package does not decode.
pub fn write_dump(handler: &SceneDataHandler, package: &[u8]) -> Result<String, DumpError> {
    let scene = handler.unpack(package)?;
    let dump = SceneDump {
        format: DUMP_FORMAT.to_owned(),
        package: STANDARD.encode(package),
        summary: DumpSummary::of(&scene),
    };
    Ok(toml::to_string_pretty(&dump)?)
}

/// Extracts the raw package bytes from a dump without decoding them.
///
/// # Errors
///
/// Parse, format or base64 failures.
pub fn read_dump_package(text: &str) -> Result<Vec<u8>, DumpError> {
    let dump: SceneDump = toml::from_str(text)?;
    if dump.format != DUMP_FORMAT {
        return Err(DumpError::Format(dump.format));
    }
    Ok(STANDARD.decode(dump.package.trim())?)
}

/// Loads a dump into [`SceneData`] with the same contract as the wire.
///
/// # Errors
///
/// Any [`DumpError`].
pub fn load_dump(handler: &SceneDataHandler, text: &str) -> Result<SceneData, DumpError> {
    let package = read_dump_package(text)?;
    Ok(handler.unpack(&package)?)
}
