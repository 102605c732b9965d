use proptest::prelude::*;
use strata_blocks::Block;
use strata_world::worldgen::WorldGenConfig;
use strata_world::{CHUNK_SIZE, CHUNK_VOLUME, ChunkCoord, World, WorldGenMode};

#[test]
fn same_seed_fills_identical_chunks() {
    let a = World::new(1337, WorldGenMode::Normal);
    let b = World::new(1337, WorldGenMode::Normal);
    for coord in [
        ChunkCoord::new(0, 0, 0),
        ChunkCoord::new(-3, 1, 7),
        ChunkCoord::new(12, 2, -9),
    ] {
        let first = a.fill_chunk(coord);
        assert_eq!(first.len(), CHUNK_VOLUME);
        assert_eq!(first, a.fill_chunk(coord));
        assert_eq!(first, b.fill_chunk(coord));
    }
}

#[test]
fn flat_mode_has_grass_top_and_air_above() {
    let w = World::new(0, WorldGenMode::Flat { thickness: 4 });
    let cells = w.fill_chunk(ChunkCoord::new(2, 0, -1));
    let at = |x: usize, y: usize, z: usize| cells[(y * CHUNK_SIZE + z) * CHUNK_SIZE + x];
    for z in 0..CHUNK_SIZE {
        for x in 0..CHUNK_SIZE {
            assert_eq!(at(x, 0, z), Block::Stone);
            assert_eq!(at(x, 3, z), Block::Grass);
            assert_eq!(at(x, 4, z), Block::Air);
        }
    }
    let above = w.fill_chunk(ChunkCoord::new(2, 1, -1));
    assert!(above.iter().all(|b| *b == Block::Air));
}

#[test]
fn worldgen_toml_rejects_inverted_height_range() {
    assert!(WorldGenConfig::from_toml_str("[height]\nmin_y = 40\nmax_y = 10\n").is_err());
    let cfg = WorldGenConfig::from_toml_str("[water]\nlevel = 3\n").unwrap();
    assert_eq!(cfg.water.level, 3);
    assert!(cfg.water.enable);
}

#[test]
fn params_are_fixed_at_construction() {
    let params = WorldGenConfig::from_toml_str("[water]\nlevel = 30\n").unwrap();
    let w = World::with_params(7, WorldGenMode::Normal, params);
    assert_eq!(w.params().water.level, 30);
    let coord = ChunkCoord::new(1, 1, -2);
    let first = w.fill_chunk(coord);
    let again = std::thread::scope(|s| s.spawn(|| w.fill_chunk(coord)).join().unwrap());
    assert_eq!(first, again);
    assert_eq!(w.params().water.level, 30);
}

proptest! {
    // Splitting a world cell and recombining it is lossless
    #[test]
    fn from_world_recombines(wx in -100_000i32..100_000, wy in -4_000i32..4_000, wz in -100_000i32..100_000) {
        let (c, (lx, ly, lz)) = ChunkCoord::from_world(wx, wy, wz);
        prop_assert!(lx < CHUNK_SIZE && ly < CHUNK_SIZE && lz < CHUNK_SIZE);
        let (ox, oy, oz) = c.world_origin();
        prop_assert_eq!((ox + lx as i32, oy + ly as i32, oz + lz as i32), (wx, wy, wz));
    }

    #[test]
    fn plan_distance_ignores_layers(cx in -50i32..50, cz in -50i32..50, dy in -5i32..5) {
        let a = ChunkCoord::new(0, 0, 0);
        let b = ChunkCoord::new(cx, dy, cz);
        prop_assert_eq!(a.plan_distance(b), cx.abs().max(cz.abs()));
        prop_assert_eq!(a.plan_distance(b), b.plan_distance(a));
    }
}
