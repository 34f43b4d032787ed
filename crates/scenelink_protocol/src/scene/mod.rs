//! # Scene Package
//!
//! Flattened scene-graph encoding.
//!
//! ```text
//! SceneGraph ──pack──▶ bytes ──unpack──▶ SceneData ──replay──▶ SceneConstructor
//!  (arena,              (header,          (flat nodes,          (engine objects)
//!   Arc assets)          side tables,      side tables,
//!                        nodes)            SceneTree)
//! ```

mod dump;
mod graph;
mod handler;
mod node;
mod package;
mod packer;
mod replay;
mod tree;

pub use dump::{
    load_dump, read_dump_package, write_dump, DumpError, DumpSummary, OutlineEntry, SceneDump,
    DUMP_FORMAT,
};
pub use graph::{CharacterRig, NodeHandle, SceneGraph};
pub use handler::{SceneData, SceneDataHandler};
pub use node::{
    CameraData, GeoData, LightData, LightType, NodeKind, NodePayload, SceneNode, SkinnedGeoData,
};
pub use package::{
    CharacterPackage, MaterialKind, MaterialPackage, MeshPackage, SceneHeader, TextureBinaryType,
    TexturePackage, PACKAGE_MAGIC, PACKAGE_VERSION,
};
pub use packer::{pack_node, unpack_node};
pub use replay::{LoadSettings, NodeAssets, NodeContext, SceneConstructor};
pub use tree::SceneTree;
