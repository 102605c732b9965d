//! Chunk cell storage, boundary snapshots, and the generation contract.
#![forbid(unsafe_code)]

mod boundary;
mod error;
mod face;

use std::sync::Arc;

use strata_blocks::Block;
use strata_world::{CHUNK_SIZE, CHUNK_VOLUME, ChunkCoord, World};

pub use boundary::{BoundarySlice, BoundarySnapshot};
pub use error::ContractViolation;
pub use face::Face;

/// Immutable, shareable cell array. Writers go through `ChunkBuf`, which copies on write.
pub type CellData = Arc<[Block]>;

#[inline]
pub const fn idx(x: usize, y: usize, z: usize) -> usize {
    (y * CHUNK_SIZE + z) * CHUNK_SIZE + x
}

#[derive(Clone, Debug)]
pub struct ChunkBuf {
    pub coord: ChunkCoord,
    cells: CellData,
    empty: bool,
    dirty: bool,
    rev: u64,
}

impl ChunkBuf {
    pub fn new_empty(coord: ChunkCoord) -> Self {
        Self {
            coord,
            cells: Arc::from(vec![Block::Air; CHUNK_VOLUME]),
            empty: true,
            dirty: false,
            rev: 0,
        }
    }

    /// Wraps an existing cell array (fresh from generation or a cache). Not dirty.
    pub fn from_cells(coord: ChunkCoord, cells: CellData) -> Result<Self, ContractViolation> {
        check_len(coord, cells.len())?;
        let empty = all_air(&cells);
        Ok(Self {
            coord,
            cells,
            empty,
            dirty: false,
            rev: 0,
        })
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Block {
        if x >= CHUNK_SIZE || y >= CHUNK_SIZE || z >= CHUNK_SIZE {
            return Block::Air;
        }
        self.cells[idx(x, y, z)]
    }

    /// Signed local read; anything outside the chunk is `Air`.
    #[inline]
    pub fn get_i(&self, x: i32, y: i32, z: i32) -> Block {
        if x < 0 || y < 0 || z < 0 {
            return Block::Air;
        }
        self.get(x as usize, y as usize, z as usize)
    }

    /// Writes one cell. Returns false (and changes nothing) when out of bounds or unchanged.
    pub fn set(&mut self, x: usize, y: usize, z: usize, block: Block) -> bool {
        if x >= CHUNK_SIZE || y >= CHUNK_SIZE || z >= CHUNK_SIZE {
            return false;
        }
        let i = idx(x, y, z);
        let prev = self.cells[i];
        if prev == block {
            return false;
        }
        if let Some(cells) = Arc::get_mut(&mut self.cells) {
            cells[i] = block;
        } else {
            let mut owned = self.cells.to_vec();
            owned[i] = block;
            self.cells = Arc::from(owned);
        }
        if !block.is_air() {
            self.empty = false;
        } else if !prev.is_air() {
            self.empty = all_air(&self.cells);
        }
        self.dirty = true;
        self.rev += 1;
        true
    }

    /// Bulk replacement; recomputes emptiness. Counts as a mutation.
    pub fn replace_all(&mut self, cells: CellData) -> Result<(), ContractViolation> {
        check_len(self.coord, cells.len())?;
        self.empty = all_air(&cells);
        self.cells = cells;
        self.dirty = true;
        self.rev += 1;
        Ok(())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn revision(&self) -> u64 {
        self.rev
    }

    /// Read-only view of the cells, shareable with a worker.
    #[inline]
    pub fn cells(&self) -> &CellData {
        &self.cells
    }

    /// Data to keep after this buffer is dropped: an owned copy when dirty,
    /// otherwise the same shared allocation.
    pub fn snapshot_for_cache(&self) -> CellData {
        if self.dirty {
            Arc::from(self.cells.to_vec())
        } else {
            Arc::clone(&self.cells)
        }
    }

    /// Copies the layer of this chunk touching its `face` side.
    pub fn face_slice(&self, face: Face) -> BoundarySlice {
        let last = CHUNK_SIZE - 1;
        let mut out = Vec::with_capacity(CHUNK_SIZE * CHUNK_SIZE);
        for v in 0..CHUNK_SIZE {
            for u in 0..CHUNK_SIZE {
                let (x, y, z) = match face {
                    Face::PosX => (last, v, u),
                    Face::NegX => (0, v, u),
                    Face::PosY => (u, last, v),
                    Face::NegY => (u, 0, v),
                    Face::PosZ => (u, v, last),
                    Face::NegZ => (u, v, 0),
                };
                out.push(self.cells[idx(x, y, z)]);
            }
        }
        BoundarySlice::from_layer(out)
    }
}

#[inline]
fn all_air(cells: &[Block]) -> bool {
    cells.iter().all(|b| b.is_air())
}

#[inline]
fn check_len(coord: ChunkCoord, got: usize) -> Result<(), ContractViolation> {
    if got != CHUNK_VOLUME {
        return Err(ContractViolation::CellCount {
            coord,
            expected: CHUNK_VOLUME,
            got,
        });
    }
    Ok(())
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkOccupancy {
    Empty,
    Populated,
}

impl ChunkOccupancy {
    #[inline]
    pub fn is_empty(self) -> bool {
        matches!(self, ChunkOccupancy::Empty)
    }

    #[inline]
    pub fn has_blocks(self) -> bool {
        matches!(self, ChunkOccupancy::Populated)
    }

    #[inline]
    pub fn of(cells: &[Block]) -> Self {
        if all_air(cells) {
            ChunkOccupancy::Empty
        } else {
            ChunkOccupancy::Populated
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChunkGenerateResult {
    pub blocks: Vec<Block>,
    /// Emptiness hint from the generator. `Empty` lets the streamer record the
    /// chunk without scanning its cells; `Populated` is re-checked on install.
    pub occupancy: ChunkOccupancy,
}

/// Content source for chunk cells. Must be deterministic for a given seed and
/// coordinate, and free of side effects: it runs on worker threads.
pub trait ChunkGenerator: Send + Sync {
    fn seed(&self) -> i32;
    fn generate(&self, coord: ChunkCoord) -> ChunkGenerateResult;
}

impl ChunkGenerator for World {
    fn seed(&self) -> i32 {
        self.seed
    }

    fn generate(&self, coord: ChunkCoord) -> ChunkGenerateResult {
        let blocks = self.fill_chunk(coord);
        let occupancy = ChunkOccupancy::of(&blocks);
        ChunkGenerateResult { blocks, occupancy }
    }
}
