//! Greedy surface extraction for one chunk plus its boundary snapshot.
#![forbid(unsafe_code)]

mod chunk;
mod extract;
mod greedy;
mod mesh_build;
mod scratch;

pub use chunk::{ChunkMeshCPU, CollisionMesh, SurfaceKind, SurfacePart};
pub use extract::extract_surfaces;
pub use greedy::{VisitedBits, greedy_rects};
pub use mesh_build::MeshBuild;
pub use scratch::{MeshScratch, SurfaceClass};
pub use strata_chunk::Face;
