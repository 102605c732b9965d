use strata_blocks::{Block, BlockClass, BlockPalette};
use strata_chunk::{BoundarySnapshot, ContractViolation, Face};
use strata_geom::Vec3;
use strata_world::{CHUNK_SIZE, CHUNK_VOLUME, ChunkCoord};

use crate::chunk::{ChunkMeshCPU, CollisionMesh, SurfaceKind, SurfacePart, chunk_bounds};
use crate::greedy::greedy_rects;
use crate::mesh_build::{MeshBuild, clockwise};
use crate::scratch::{MeshScratch, SurfaceClass};

const N: usize = CHUNK_SIZE;

/// Builds render and collision geometry for one chunk.
///
/// `cells` must hold `CHUNK_VOLUME` blocks in `(y*N+z)*N+x` order. Neighbor
/// cells outside the chunk come from `boundary`; a missing face reads as air.
/// Output positions are world-space.
pub fn extract_surfaces(
    coord: ChunkCoord,
    cells: &[Block],
    boundary: &BoundarySnapshot,
    palette: &BlockPalette,
    scratch: &mut MeshScratch,
) -> Result<ChunkMeshCPU, ContractViolation> {
    if cells.len() != CHUNK_VOLUME {
        return Err(ContractViolation::CellCount {
            coord,
            expected: CHUNK_VOLUME,
            got: cells.len(),
        });
    }
    if cells.iter().all(|b| b.is_air()) {
        return Ok(ChunkMeshCPU::empty(coord));
    }

    let (ox, oy, oz) = coord.world_origin();
    let base = Vec3::new(ox as f32, oy as f32, oz as f32);
    let mut opaque = MeshBuild::default();
    let mut liquid = MeshBuild::default();
    let mut collision = CollisionMesh::default();

    for face in Face::ALL {
        let n = face.normal();
        for depth in 0..N {
            scratch.clear_masks();
            let mut any = false;
            for v in 0..N {
                for u in 0..N {
                    let (x, y, z) = cell_at(face, depth, u, v);
                    let here = cells[strata_chunk::idx(x, y, z)];
                    if here.is_air() {
                        continue;
                    }
                    let there = neighbor(cells, boundary, face, (x, y, z), u, v);
                    let i = v * N + u;
                    match (here.class(), there.class()) {
                        (BlockClass::Solid, BlockClass::Empty | BlockClass::Liquid) => {
                            scratch.opaque[i] = Some(here);
                            scratch.collide[i] = Some(SurfaceClass::Solid);
                            any = true;
                        }
                        (BlockClass::Liquid, BlockClass::Empty) => {
                            scratch.liquid[i] = Some(here);
                            any = true;
                        }
                        _ => {}
                    }
                }
            }
            if !any {
                continue;
            }

            let MeshScratch {
                opaque: opaque_mask,
                liquid: liquid_mask,
                collide: collide_mask,
                visited,
            } = &mut *scratch;
            greedy_rects(N, N, opaque_mask, visited, |u, v, w, h, block| {
                let [a, b, c, d] = quad_corners(base, face, depth, u, v, w, h);
                opaque.add_quad(a, b, c, d, n, palette.color(block, face.role()));
            });
            greedy_rects(N, N, liquid_mask, visited, |u, v, w, h, block| {
                let [a, b, c, d] = quad_corners(base, face, depth, u, v, w, h);
                liquid.add_quad(a, b, c, d, n, palette.color(block, face.role()));
            });
            greedy_rects(N, N, collide_mask, visited, |u, v, w, h, _class| {
                let [a, b, c, d] = quad_corners(base, face, depth, u, v, w, h);
                collision.push_quad(&clockwise(a, b, c, d, n));
            });
        }
    }

    let mut parts = Vec::with_capacity(2);
    if !opaque.is_empty() {
        parts.push(SurfacePart {
            kind: SurfaceKind::Opaque,
            mesh: opaque,
        });
    }
    if !liquid.is_empty() {
        parts.push(SurfacePart {
            kind: SurfaceKind::Liquid,
            mesh: liquid,
        });
    }
    log::trace!(
        target: "mesh",
        "extracted ({}, {}, {}): {} parts, {} collision tris",
        coord.cx,
        coord.cy,
        coord.cz,
        parts.len(),
        collision.triangle_count()
    );
    Ok(ChunkMeshCPU {
        coord,
        bbox: chunk_bounds(coord),
        parts,
        collision,
    })
}

// In-slice axes: X faces (u=z, v=y), Y faces (u=x, v=z), Z faces (u=x, v=y).
#[inline]
fn cell_at(face: Face, depth: usize, u: usize, v: usize) -> (usize, usize, usize) {
    match face {
        Face::PosX | Face::NegX => (depth, v, u),
        Face::PosY | Face::NegY => (u, depth, v),
        Face::PosZ | Face::NegZ => (u, v, depth),
    }
}

#[inline]
fn neighbor(
    cells: &[Block],
    boundary: &BoundarySnapshot,
    face: Face,
    (x, y, z): (usize, usize, usize),
    u: usize,
    v: usize,
) -> Block {
    let (dx, dy, dz) = face.delta();
    let (nx, ny, nz) = (x as i32 + dx, y as i32 + dy, z as i32 + dz);
    let n = N as i32;
    if (0..n).contains(&nx) && (0..n).contains(&ny) && (0..n).contains(&nz) {
        cells[strata_chunk::idx(nx as usize, ny as usize, nz as usize)]
    } else {
        boundary.get(face, u, v)
    }
}

fn quad_corners(
    base: Vec3,
    face: Face,
    depth: usize,
    u: usize,
    v: usize,
    w: usize,
    h: usize,
) -> [Vec3; 4] {
    let plane = match face {
        Face::PosX | Face::PosY | Face::PosZ => (depth + 1) as f32,
        _ => depth as f32,
    };
    let (u0, v0) = (u as f32, v as f32);
    let (u1, v1) = ((u + w) as f32, (v + h) as f32);
    let at = |pu: f32, pv: f32| {
        let local = match face {
            Face::PosX | Face::NegX => Vec3::new(plane, pv, pu),
            Face::PosY | Face::NegY => Vec3::new(pu, plane, pv),
            Face::PosZ | Face::NegZ => Vec3::new(pu, pv, plane),
        };
        base + local
    };
    [at(u0, v0), at(u1, v0), at(u1, v1), at(u0, v1)]
}
