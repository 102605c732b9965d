use serde::{Deserialize, Serialize};

use crate::CHUNK_SIZE;

/// Cell position inside a chunk, each axis in `[0, CHUNK_SIZE)`.
pub type LocalPos = (usize, usize, usize);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cy: i32, cz: i32) -> Self {
        Self { cx, cy, cz }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cy: self.cy + dy,
            cz: self.cz + dz,
        }
    }

    /// Chebyshev distance on the horizontal plane; layers are ignored.
    #[inline]
    pub fn plan_distance(self, other: ChunkCoord) -> i32 {
        (self.cx - other.cx).abs().max((self.cz - other.cz).abs())
    }

    /// Splits a world cell position into its chunk and local cell.
    #[inline]
    pub fn from_world(wx: i32, wy: i32, wz: i32) -> (ChunkCoord, LocalPos) {
        let s = CHUNK_SIZE as i32;
        let coord = ChunkCoord::new(wx.div_euclid(s), wy.div_euclid(s), wz.div_euclid(s));
        let local = (
            wx.rem_euclid(s) as usize,
            wy.rem_euclid(s) as usize,
            wz.rem_euclid(s) as usize,
        );
        (coord, local)
    }

    /// World cell position of this chunk's (0,0,0) corner.
    #[inline]
    pub fn world_origin(self) -> (i32, i32, i32) {
        let s = CHUNK_SIZE as i32;
        (self.cx * s, self.cy * s, self.cz * s)
    }
}

impl From<(i32, i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<ChunkCoord> for (i32, i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cy, value.cz)
    }
}
