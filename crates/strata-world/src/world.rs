use std::sync::Arc;

use fastnoise_lite::{FastNoiseLite, NoiseType};
use strata_blocks::Block;

use crate::worldgen::WorldGenParams;
use crate::{CHUNK_SIZE, CHUNK_VOLUME, ChunkCoord, GenCtx};

/// Seeded terrain source. Same seed and coordinate always fill the same cells.
pub struct World {
    pub seed: i32,
    pub mode: WorldGenMode,
    params: Arc<WorldGenParams>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WorldGenMode {
    Normal,
    /// Solid stone for world y in `[0, thickness)` with a grass top.
    Flat { thickness: i32 },
}

impl World {
    pub fn new(seed: i32, mode: WorldGenMode) -> Self {
        Self::with_params(seed, mode, WorldGenParams::default())
    }

    pub fn with_params(seed: i32, mode: WorldGenMode, params: WorldGenParams) -> Self {
        Self {
            seed,
            mode,
            params: Arc::new(params),
        }
    }

    /// Terrain parameters, fixed for the lifetime of the world.
    pub fn params(&self) -> &WorldGenParams {
        &self.params
    }

    pub fn make_gen_ctx(&self) -> GenCtx {
        let params = Arc::clone(&self.params);
        let mut height = FastNoiseLite::with_seed(self.seed);
        height.set_noise_type(Some(NoiseType::OpenSimplex2));
        height.set_frequency(Some(params.height.frequency));
        let mut detail = FastNoiseLite::with_seed(self.seed ^ 99_173);
        detail.set_noise_type(Some(NoiseType::OpenSimplex2));
        detail.set_frequency(Some(params.height.detail_frequency));
        GenCtx {
            height,
            detail,
            params,
        }
    }

    /// Surface height (first air cell) of the column at `(wx, wz)`.
    pub fn column_height(&self, ctx: &GenCtx, wx: i32, wz: i32) -> i32 {
        if let WorldGenMode::Flat { thickness } = self.mode {
            return thickness;
        }
        let h = &ctx.params.height;
        let x = wx as f32;
        let z = wz as f32;
        let base = ctx.height.get_noise_2d(x, z) * 0.5 + 0.5;
        let detail = ctx.detail.get_noise_2d(x, z) * h.detail_amplitude;
        let span = (h.max_y - h.min_y) as f32;
        (h.min_y as f32 + base * span + detail).round() as i32
    }

    /// Block at a world cell for a column whose surface height is already known.
    pub fn block_in_column(&self, ctx: &GenCtx, wy: i32, surface: i32) -> Block {
        if let WorldGenMode::Flat { .. } = self.mode {
            return match wy {
                y if y < 0 || y >= surface => Block::Air,
                y if y == surface - 1 => Block::Grass,
                _ => Block::Stone,
            };
        }
        let p = &ctx.params;
        if wy < surface {
            let depth = surface - 1 - wy;
            if depth == 0 {
                if surface - 1 >= p.surface.snow_line {
                    Block::Snow
                } else if p.water.enable && surface - 1 <= p.water.level + p.surface.beach_band {
                    Block::Sand
                } else {
                    Block::Grass
                }
            } else if depth < p.surface.topsoil_thickness {
                Block::Dirt
            } else {
                Block::Stone
            }
        } else if p.water.enable && wy < p.water.level {
            Block::Water
        } else {
            Block::Air
        }
    }

    /// Fills the dense cell array of one chunk, x fastest then z then y.
    pub fn fill_chunk(&self, coord: ChunkCoord) -> Vec<Block> {
        let ctx = self.make_gen_ctx();
        let mut blocks = vec![Block::Air; CHUNK_VOLUME];
        let (bx, by, bz) = coord.world_origin();
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let wx = bx + x as i32;
                let wz = bz + z as i32;
                let surface = self.column_height(&ctx, wx, wz);
                for y in 0..CHUNK_SIZE {
                    let b = self.block_in_column(&ctx, by + y as i32, surface);
                    blocks[(y * CHUNK_SIZE + z) * CHUNK_SIZE + x] = b;
                }
            }
        }
        blocks
    }
}
