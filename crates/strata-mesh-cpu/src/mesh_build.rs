use strata_blocks::palette::Rgba;
use strata_geom::Vec3;

#[derive(Default, Clone, Debug)]
pub struct MeshBuild {
    pub pos: Vec<f32>,
    pub norm: Vec<f32>,
    pub col: Vec<u8>,
    pub idx: Vec<u16>,
}

impl MeshBuild {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.pos.len() / 3
    }

    #[inline]
    pub fn quad_count(&self) -> usize {
        self.idx.len() / 6
    }

    /// Appends a quad as triangles (0,1,2) and (0,2,3), reordering the corners so
    /// both are clockwise seen from the side `n` points to.
    pub fn add_quad(&mut self, a: Vec3, b: Vec3, c: Vec3, d: Vec3, n: Vec3, rgba: Rgba) {
        let vs = clockwise(a, b, c, d, n);
        let base = self.vertex_count() as u16;
        for v in &vs {
            self.pos.extend_from_slice(&v.to_array());
            self.norm.extend_from_slice(&n.to_array());
            self.col.extend_from_slice(&rgba);
        }
        self.idx
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Returns a slice of interleaved vertex positions (x,y,z per vertex).
    pub fn positions(&self) -> &[f32] {
        &self.pos
    }

    /// Returns a slice of interleaved vertex normals (x,y,z per vertex).
    pub fn normals(&self) -> &[f32] {
        &self.norm
    }
}

pub(crate) fn clockwise(a: Vec3, b: Vec3, c: Vec3, d: Vec3, n: Vec3) -> [Vec3; 4] {
    let mut vs = [a, b, c, d];
    let cross = (vs[1] - vs[0]).cross(vs[2] - vs[0]);
    if cross.dot(n) > 0.0 {
        vs.swap(1, 3);
    }
    vs
}
