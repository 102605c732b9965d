use strata_blocks::Block;
use strata_chunk::ChunkBuf;
use strata_mesh_cpu::{ChunkMeshCPU, CollisionMesh, SurfacePart};
use strata_world::ChunkCoord;

/// A loaded chunk: its cells plus the geometry last built from them.
#[derive(Debug)]
pub struct Chunk {
    buf: ChunkBuf,
    mesh: Option<ChunkMeshCPU>,
    collision_enabled: bool,
}

impl Chunk {
    pub fn new(buf: ChunkBuf, collision_enabled: bool) -> Self {
        Self {
            buf,
            mesh: None,
            collision_enabled,
        }
    }

    #[inline]
    pub fn coord(&self) -> ChunkCoord {
        self.buf.coord
    }

    #[inline]
    pub fn buf(&self) -> &ChunkBuf {
        &self.buf
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Block {
        self.buf.get(x, y, z)
    }

    /// Writes one cell. Built geometry stays until a new mesh is applied.
    pub fn set(&mut self, x: usize, y: usize, z: usize, block: Block) -> bool {
        self.buf.set(x, y, z, block)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.buf.is_dirty()
    }

    #[inline]
    pub fn revision(&self) -> u64 {
        self.buf.revision()
    }

    pub fn set_mesh(&mut self, mesh: ChunkMeshCPU) {
        self.mesh = Some(mesh);
    }

    #[inline]
    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    pub fn mesh(&self) -> Option<&ChunkMeshCPU> {
        self.mesh.as_ref()
    }

    /// Zero, one, or two parts (opaque, then liquid).
    pub fn render_parts(&self) -> &[SurfacePart] {
        self.mesh.as_ref().map(|m| m.parts.as_slice()).unwrap_or(&[])
    }

    /// Collision triangles, exposed only while collision is enabled.
    pub fn collision(&self) -> Option<&CollisionMesh> {
        if !self.collision_enabled {
            return None;
        }
        self.mesh.as_ref().map(|m| &m.collision)
    }

    #[inline]
    pub fn collision_enabled(&self) -> bool {
        self.collision_enabled
    }

    pub fn set_collision_enabled(&mut self, enabled: bool) {
        self.collision_enabled = enabled;
    }

    pub(crate) fn into_buf(self) -> ChunkBuf {
        self.buf
    }
}
