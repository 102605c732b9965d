use strata_blocks::Block;
use strata_world::CHUNK_AREA;

use crate::greedy::VisitedBits;

/// Collision mask key. Every solid block type collides the same way.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceClass {
    Solid,
}

/// Per-call working memory for `extract_surfaces`. One per worker; never shared.
#[derive(Clone, Debug)]
pub struct MeshScratch {
    pub(crate) opaque: Vec<Option<Block>>,
    pub(crate) liquid: Vec<Option<Block>>,
    pub(crate) collide: Vec<Option<SurfaceClass>>,
    pub(crate) visited: VisitedBits,
}

impl MeshScratch {
    pub fn new() -> Self {
        Self {
            opaque: vec![None; CHUNK_AREA],
            liquid: vec![None; CHUNK_AREA],
            collide: vec![None; CHUNK_AREA],
            visited: VisitedBits::new(CHUNK_AREA),
        }
    }

    pub(crate) fn clear_masks(&mut self) {
        self.opaque.fill(None);
        self.liquid.fill(None);
        self.collide.fill(None);
    }
}

impl Default for MeshScratch {
    fn default() -> Self {
        Self::new()
    }
}
