use strata_geom::Vec3;
use strata_world::ChunkCoord;

/// Straight-line viewpoint path at a fixed altitude.
pub struct Flight {
    pos: Vec3,
    step: Vec3,
}

impl Flight {
    pub fn new(heading_deg: f32, speed: f32) -> Self {
        let h = heading_deg.to_radians();
        Self {
            pos: Vec3::new(0.5, 48.0, 0.5),
            step: Vec3::new(h.cos(), 0.0, h.sin()) * speed,
        }
    }

    pub fn advance(&mut self) {
        self.pos += self.step;
    }

    pub fn cell(&self) -> (i32, i32) {
        (self.pos.x.floor() as i32, self.pos.z.floor() as i32)
    }

    pub fn chunk(&self) -> ChunkCoord {
        let (wx, wz) = self.cell();
        ChunkCoord::from_world(wx, self.pos.y.floor() as i32, wz).0
    }
}
