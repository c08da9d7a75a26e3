//! CPU meshing crate: turns height maps into LOD terrain meshes (engine-only).
#![forbid(unsafe_code)]

mod build;
mod lod;
mod payload;

pub use build::{LodMeshBuilder, build_lod_mesh};
pub use lod::{MIN_VERTS_PER_LINE, MeshError, check_height_map, lod_stride};
pub use payload::{MeshPayload, VertexKind};
