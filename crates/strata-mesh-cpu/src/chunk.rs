use strata_geom::{Aabb, Vec3};
use strata_world::{CHUNK_SIZE, ChunkCoord};

use crate::mesh_build::MeshBuild;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Opaque,
    /// Alpha-blended; drawn after opaque parts.
    Liquid,
}

#[derive(Clone, Debug)]
pub struct SurfacePart {
    pub kind: SurfaceKind,
    pub mesh: MeshBuild,
}

/// Flat, unindexed triangle soup: x,y,z per vertex, three vertices per triangle.
#[derive(Clone, Debug, Default)]
pub struct CollisionMesh {
    pub tris: Vec<f32>,
}

impl CollisionMesh {
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.tris.len() / 9
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tris.is_empty()
    }

    // Same vertex order as the render quad, split (0,1,2) (0,2,3).
    pub(crate) fn push_quad(&mut self, vs: &[Vec3; 4]) {
        for i in [0, 1, 2, 0, 2, 3] {
            self.tris.extend_from_slice(&vs[i].to_array());
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChunkMeshCPU {
    pub coord: ChunkCoord,
    pub bbox: Aabb,
    pub parts: Vec<SurfacePart>,
    pub collision: CollisionMesh,
}

impl ChunkMeshCPU {
    /// Geometry of a chunk with nothing to draw.
    pub fn empty(coord: ChunkCoord) -> Self {
        Self {
            coord,
            bbox: chunk_bounds(coord),
            parts: Vec::new(),
            collision: CollisionMesh::default(),
        }
    }

    pub fn part(&self, kind: SurfaceKind) -> Option<&MeshBuild> {
        self.parts.iter().find(|p| p.kind == kind).map(|p| &p.mesh)
    }

    pub fn quad_count(&self) -> usize {
        self.parts.iter().map(|p| p.mesh.quad_count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty() && self.collision.is_empty()
    }
}

pub(crate) fn chunk_bounds(coord: ChunkCoord) -> Aabb {
    let (ox, oy, oz) = coord.world_origin();
    let n = CHUNK_SIZE as f32;
    let min = Vec3::new(ox as f32, oy as f32, oz as f32);
    Aabb::new(min, Vec3::new(min.x + n, min.y + n, min.z + n))
}
