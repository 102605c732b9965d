use strata_blocks::Block;
use strata_world::{CHUNK_AREA, CHUNK_SIZE};

use crate::{ContractViolation, Face};

/// One N×N layer of a neighbor, laid out `v * N + u`.
///
/// In-slice axes per face normal: X faces use (u=z, v=y), Y faces (u=x, v=z),
/// Z faces (u=x, v=y).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundarySlice {
    cells: Box<[Block]>,
}

impl BoundarySlice {
    pub fn new(cells: Vec<Block>) -> Result<Self, ContractViolation> {
        if cells.len() != CHUNK_AREA {
            return Err(ContractViolation::BoundarySize {
                expected: CHUNK_AREA,
                got: cells.len(),
            });
        }
        Ok(Self {
            cells: cells.into_boxed_slice(),
        })
    }

    // Caller guarantees CHUNK_AREA cells.
    pub(crate) fn from_layer(cells: Vec<Block>) -> Self {
        debug_assert_eq!(cells.len(), CHUNK_AREA);
        Self {
            cells: cells.into_boxed_slice(),
        }
    }

    pub fn filled(block: Block) -> Self {
        Self::from_layer(vec![block; CHUNK_AREA])
    }

    #[inline]
    pub fn get(&self, u: usize, v: usize) -> Block {
        if u >= CHUNK_SIZE || v >= CHUNK_SIZE {
            return Block::Air;
        }
        self.cells[v * CHUNK_SIZE + u]
    }
}

/// Copies of the six neighbor layers facing a chunk, taken when its mesh job
/// is dispatched. A missing slice reads as `Air`.
#[derive(Clone, Debug, Default)]
pub struct BoundarySnapshot {
    faces: [Option<BoundarySlice>; 6],
}

impl BoundarySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the neighbor layer seen when looking out through `face`.
    pub fn set(&mut self, face: Face, slice: BoundarySlice) {
        self.faces[face.index()] = Some(slice);
    }

    #[inline]
    pub fn slice(&self, face: Face) -> Option<&BoundarySlice> {
        self.faces[face.index()].as_ref()
    }

    #[inline]
    pub fn get(&self, face: Face, u: usize, v: usize) -> Block {
        self.slice(face).map_or(Block::Air, |s| s.get(u, v))
    }

    pub fn present_faces(&self) -> usize {
        self.faces.iter().filter(|f| f.is_some()).count()
    }
}
