use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use strata_blocks::{Block, BlockPalette};
use strata_chunk::{ChunkGenerateResult, ChunkGenerator, ChunkOccupancy};
use strata_stream::config::MAX_RADIUS;
use strata_stream::{ChunkStreamer, StreamConfig, StreamError};
use strata_world::{ChunkCoord, World, WorldGenMode};

/// Flat world wrapper that counts calls per coordinate and peak concurrency,
/// and can hold back every chunk with `cx == gate_cx` until released.
struct Tally {
    world: World,
    calls: Mutex<HashMap<ChunkCoord, usize>>,
    running: AtomicUsize,
    peak: AtomicUsize,
    gate_cx: Option<i32>,
    open: AtomicBool,
    delay: Duration,
}

impl Tally {
    fn new() -> Self {
        Self {
            world: World::new(42, WorldGenMode::Flat { thickness: 4 }),
            calls: Mutex::new(HashMap::new()),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            gate_cx: None,
            open: AtomicBool::new(true),
            delay: Duration::ZERO,
        }
    }

    fn gated(cx: i32) -> Self {
        let p = Self::new();
        p.open.store(false, Ordering::SeqCst);
        Self {
            gate_cx: Some(cx),
            ..p
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    fn calls(&self, coord: ChunkCoord) -> usize {
        self.calls.lock().unwrap().get(&coord).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

impl ChunkGenerator for Tally {
    fn seed(&self) -> i32 {
        self.world.seed
    }

    fn generate(&self, coord: ChunkCoord) -> ChunkGenerateResult {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if self.gate_cx == Some(coord.cx) {
            while !self.open.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
        }
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        *self.calls.lock().unwrap().entry(coord).or_insert(0) += 1;
        let out = self.world.generate(coord);
        self.running.fetch_sub(1, Ordering::SeqCst);
        out
    }
}

fn config(radius: i32) -> StreamConfig {
    StreamConfig {
        radius,
        vertical_layers: 1,
        base_layer: 0,
        hysteresis: 1,
        prefetch_width: 0,
        workers: 4,
        ..StreamConfig::default()
    }
}

fn streamer(cfg: StreamConfig, tally: &Arc<Tally>) -> ChunkStreamer {
    let generator: Arc<dyn ChunkGenerator> = tally.clone();
    ChunkStreamer::new(cfg, generator, Arc::new(BlockPalette::default())).unwrap()
}

/// Ticks until nothing is queued or running, checking the budgets every tick.
fn settle(s: &mut ChunkStreamer, view: ChunkCoord, radius: i32) {
    let cfg = s.config().clone();
    let gen_cap = cfg.gen_budget * cfg.gen_burst_multiplier;
    let deadline = Instant::now() + Duration::from_secs(60);
    loop {
        let report = s.update_loaded_chunks(view, radius).unwrap();
        assert!(report.inflight_gen <= gen_cap);
        assert!(report.inflight_mesh <= cfg.mesh_budget);
        assert!(report.inflight_prefetch <= cfg.max_inflight_prefetch);
        if s.is_idle() {
            return;
        }
        assert!(Instant::now() < deadline, "streamer did not settle");
        thread::sleep(Duration::from_millis(1));
    }
}

fn c(cx: i32, cz: i32) -> ChunkCoord {
    ChunkCoord::new(cx, 0, cz)
}

/// Render quads of a loaded chunk whose normal satisfies `keep`.
fn quads_facing(s: &ChunkStreamer, coord: ChunkCoord, keep: impl Fn([f32; 3]) -> bool) -> usize {
    let chunk = s.chunk(coord).unwrap();
    chunk
        .render_parts()
        .iter()
        .flat_map(|p| p.mesh.normals().chunks_exact(12))
        .filter(|quad| keep([quad[0], quad[1], quad[2]]))
        .count()
}

fn is_side(n: [f32; 3]) -> bool {
    n[0] != 0.0 || n[2] != 0.0
}

#[test]
fn window_loads_and_meshes() {
    let tally = Arc::new(Tally::new());
    let mut s = streamer(config(2), &tally);
    settle(&mut s, c(0, 0), 2);
    assert_eq!(s.loaded_count(), 25);
    for dz in -2..=2 {
        for dx in -2..=2 {
            assert!(s.is_chunk_ready(c(dx, dz)), "({dx}, {dz}) not ready");
        }
    }
    assert!(!s.is_loaded(c(3, 0)));
    let chunk = s.chunk(c(0, 0)).unwrap();
    assert_eq!(chunk.render_parts().len(), 1);
    // Generation is deterministic, so nothing was produced twice.
    assert_eq!(tally.total_calls(), 25);
}

#[test]
fn seams_between_loaded_neighbors_are_hidden() {
    let tally = Arc::new(Tally::new());
    let mut s = streamer(config(2), &tally);
    settle(&mut s, c(0, 0), 2);
    for dz in -1..=1 {
        for dx in -1..=1 {
            let coord = c(dx, dz);
            // Grass top and the stone underside against the unloaded layer below.
            assert_eq!(s.chunk(coord).unwrap().mesh().unwrap().quad_count(), 2);
            assert_eq!(quads_facing(&s, coord, is_side), 0, "({dx}, {dz}) shows a seam");
        }
    }
    // Window edges face unloaded space: one stone and one grass strip per open side.
    assert_eq!(quads_facing(&s, c(2, 0), is_side), 2);
    assert_eq!(quads_facing(&s, c(2, 0), |n| n[0] > 0.0), 2);
    assert_eq!(quads_facing(&s, c(2, 2), is_side), 4);
    assert_eq!(quads_facing(&s, c(-2, 1), |n| n[0] < 0.0), 2);
}

#[test]
fn edge_edit_remeshes_the_neighbor() {
    let tally = Arc::new(Tally::new());
    let mut s = streamer(config(1), &tally);
    settle(&mut s, c(0, 0), 1);
    assert_eq!(quads_facing(&s, c(1, 0), |n| n[0] < 0.0), 0);
    let neighbor_rev = s.chunk(c(1, 0)).unwrap().revision();

    // x = 15 is the last column of chunk (0, 0); the hole exposes (1, 0)'s -X face.
    assert!(s.set_block(15, 1, 5, Block::Air));
    settle(&mut s, c(0, 0), 1);

    assert_eq!(quads_facing(&s, c(1, 0), |n| n[0] < 0.0), 1);
    assert_eq!(s.chunk(c(1, 0)).unwrap().revision(), neighbor_rev);
    // Hole walls on the edited side: +X, +Y, -Y, +Z, -Z.
    assert_eq!(s.chunk(c(0, 0)).unwrap().mesh().unwrap().quad_count(), 7);
    assert_eq!(quads_facing(&s, c(0, 0), |n| n[0] < 0.0), 0);
    assert_eq!(s.chunk(c(0, 0)).unwrap().revision(), 1);
}

#[test]
fn empty_chunks_are_tracked_without_geometry() {
    let tally = Arc::new(Tally::new());
    let cfg = StreamConfig {
        vertical_layers: 2,
        ..config(1)
    };
    let mut s = streamer(cfg, &tally);
    settle(&mut s, c(0, 0), 1);
    for dz in -1..=1 {
        for dx in -1..=1 {
            let sky = ChunkCoord::new(dx, 1, dz);
            assert!(s.is_known_empty(sky));
            assert!(!s.is_loaded(sky));
            assert!(s.is_chunk_ready(sky));
            assert!(s.is_loaded(c(dx, dz)));
        }
    }
    assert_eq!(s.loaded_count(), 9);
    assert_eq!(s.empty_count(), 9);
    assert!(s.chunks().all(|ch| !ch.is_empty() && ch.has_mesh()));
}

#[test]
fn dirty_chunk_survives_unload_and_reload() {
    let tally = Arc::new(Tally::new());
    let cfg = StreamConfig {
        hysteresis: 0,
        cache_evict_multiplier: 20.0,
        ..config(1)
    };
    let mut s = streamer(cfg, &tally);
    settle(&mut s, c(0, 0), 1);
    assert_eq!(s.get_block(5, 10, 5), Block::Air);
    assert!(s.set_block(5, 10, 5, Block::Wood));
    assert!(s.set_block(6, 2, 6, Block::Air));
    assert!(s.chunk(c(0, 0)).unwrap().is_dirty());

    settle(&mut s, c(4, 0), 1);
    assert!(!s.is_loaded(c(0, 0)));
    assert_eq!(s.get_block(5, 10, 5), Block::Air);

    settle(&mut s, c(0, 0), 1);
    assert!(s.is_loaded(c(0, 0)));
    assert_eq!(s.get_block(5, 10, 5), Block::Wood);
    assert_eq!(s.get_block(6, 2, 6), Block::Air);
    assert_eq!(tally.calls(c(0, 0)), 1);
    assert!(s.stats().block_cache_hits >= 9);
}

#[test]
fn clean_cache_restore_matches_regeneration() {
    let tally = Arc::new(Tally::new());
    let cfg = StreamConfig {
        hysteresis: 0,
        cache_evict_multiplier: 20.0,
        ..config(0)
    };
    let mut s = streamer(cfg, &tally);
    settle(&mut s, c(0, 0), 0);
    settle(&mut s, c(3, 0), 0);
    assert!(!s.is_loaded(c(0, 0)));
    settle(&mut s, c(0, 0), 0);

    let restored = s.chunk(c(0, 0)).unwrap().buf().cells().to_vec();
    let fresh = World::new(42, WorldGenMode::Flat { thickness: 4 })
        .generate(c(0, 0))
        .blocks;
    assert_eq!(restored, fresh);
    assert_eq!(tally.calls(c(0, 0)), 1);
}

#[test]
fn abandoned_generation_is_never_installed() {
    let tally = Arc::new(Tally::gated(0));
    let cfg = StreamConfig {
        hysteresis: 0,
        ..config(0)
    };
    let mut s = streamer(cfg, &tally);
    s.update_loaded_chunks(c(0, 0), 0).unwrap();
    assert_eq!(s.inflight_generation(), 1);

    s.update_loaded_chunks(c(10, 0), 0).unwrap();
    tally.open.store(true, Ordering::SeqCst);
    settle(&mut s, c(10, 0), 0);

    assert!(!s.is_loaded(c(0, 0)));
    assert!(s.is_loaded(c(10, 0)));
    assert_eq!(tally.calls(c(0, 0)), 1);
    assert!(s.stats().stale_discards >= 1);
}

#[test]
fn returning_before_result_reuses_the_running_job() {
    let tally = Arc::new(Tally::gated(0));
    let cfg = StreamConfig {
        hysteresis: 0,
        ..config(0)
    };
    let mut s = streamer(cfg, &tally);
    s.update_loaded_chunks(c(0, 0), 0).unwrap();
    s.update_loaded_chunks(c(5, 0), 0).unwrap();
    s.update_loaded_chunks(c(0, 0), 0).unwrap();
    tally.open.store(true, Ordering::SeqCst);
    settle(&mut s, c(0, 0), 0);
    assert!(s.is_loaded(c(0, 0)));
    assert_eq!(tally.calls(c(0, 0)), 1);
}

#[test]
fn generation_concurrency_stays_within_budget() {
    let tally = Arc::new(Tally::slow(Duration::from_millis(2)));
    let cfg = StreamConfig {
        gen_budget: 3,
        gen_burst_multiplier: 1,
        workers: 8,
        ..config(4)
    };
    let mut s = streamer(cfg, &tally);
    settle(&mut s, c(0, 0), 4);
    assert_eq!(s.loaded_count(), 81);
    assert!(tally.peak.load(Ordering::SeqCst) <= 3);
    // Every job slept at least 2 ms.
    assert!(s.stats().gen_ms_total >= 81 * 2);
}

#[test]
fn burst_load_raises_budget_and_finishes() {
    let tally = Arc::new(Tally::new());
    let cfg = StreamConfig {
        gen_budget: 4,
        gen_burst_multiplier: 2,
        burst_backlog: 64,
        workers: 8,
        ..config(11)
    };
    let mut s = streamer(cfg, &tally);
    let first = s.update_loaded_chunks(c(0, 0), 11).unwrap();
    assert_eq!(first.gen_dispatched, 8);
    settle(&mut s, c(0, 0), 11);
    assert_eq!(s.loaded_count(), 23 * 23);
    assert!(tally.peak.load(Ordering::SeqCst) <= 8);
    assert_eq!(tally.total_calls(), 23 * 23);
    for dz in -11..=11 {
        for dx in -11..=11 {
            assert!(s.is_chunk_ready(c(dx, dz)));
        }
    }
}

#[test]
fn streaming_move_reuses_prefetched_ring() {
    let tally = Arc::new(Tally::new());
    let cfg = StreamConfig {
        hysteresis: 1,
        prefetch_width: 2,
        prefetch_per_tick: 8,
        max_inflight_prefetch: 16,
        ..config(3)
    };
    let mut s = streamer(cfg, &tally);
    settle(&mut s, c(0, 0), 3);
    assert_eq!(s.loaded_count(), 49);
    assert_eq!(s.prefetch_cache_len(), 11 * 11 - 7 * 7);

    let before = s.stats();
    settle(&mut s, c(5, 0), 3);

    for cx in 4..=5 {
        for cz in -3..=3 {
            assert!(s.is_loaded(c(cx, cz)));
            assert_eq!(tally.calls(c(cx, cz)), 1, "({cx}, {cz}) generated twice");
        }
    }
    assert!(s.stats().prefetch_hits - before.prefetch_hits >= 14);
    // Beyond radius + hysteresis from (5, 0): gone. Within it: kept.
    assert!(!s.is_loaded(c(0, 0)));
    assert!(!s.is_loaded(c(-3, 2)));
    assert!(s.is_loaded(c(1, 0)));
    for cx in 2..=8 {
        for cz in -3..=3 {
            assert!(s.is_chunk_ready(c(cx, cz)));
        }
    }
}

#[test]
fn prefetch_in_flight_is_promoted_not_regenerated() {
    let tally = Arc::new(Tally::gated(2));
    let cfg = StreamConfig {
        hysteresis: 1,
        prefetch_width: 1,
        prefetch_per_tick: 32,
        max_inflight_prefetch: 32,
        ..config(1)
    };
    let mut s = streamer(cfg, &tally);
    // Ring at distance 2 is prefetching and held at the gate for cx == 2.
    for _ in 0..4 {
        s.update_loaded_chunks(c(0, 0), 1).unwrap();
    }
    assert!(s.inflight_prefetch() > 0);
    s.update_loaded_chunks(c(1, 0), 1).unwrap();
    tally.open.store(true, Ordering::SeqCst);
    settle(&mut s, c(1, 0), 1);
    for cz in -1..=1 {
        assert!(s.is_loaded(c(2, cz)));
        assert_eq!(tally.calls(c(2, cz)), 1);
    }
    assert!(s.stats().prefetch_promoted >= 3);
}

#[test]
fn edits_remesh_and_empty_chunks_materialise() {
    let tally = Arc::new(Tally::new());
    let cfg = StreamConfig {
        vertical_layers: 2,
        ..config(0)
    };
    let mut s = streamer(cfg, &tally);
    settle(&mut s, c(0, 0), 0);
    let sky = ChunkCoord::new(0, 1, 0);
    assert!(s.is_known_empty(sky));

    // Writing air into known-empty space changes nothing.
    assert!(!s.set_block(3, 20, 3, Block::Air));
    assert!(s.set_block(3, 20, 3, Block::Stone));
    assert!(s.is_loaded(sky));
    assert!(!s.is_known_empty(sky));
    settle(&mut s, c(0, 0), 0);
    assert!(s.is_chunk_ready(sky));
    let rev = s.chunk(sky).unwrap().revision();
    assert_eq!(s.chunk(sky).unwrap().mesh().unwrap().quad_count(), 6);
    assert_eq!(rev, 1);

    // Clearing it again turns the chunk back into an empty entry.
    assert!(s.set_block(3, 20, 3, Block::Air));
    assert!(!s.is_loaded(sky));
    assert!(s.is_known_empty(sky));

    // Unloaded chunks ignore writes and read as air.
    assert!(!s.set_block(100, 2, 100, Block::Stone));
    assert_eq!(s.get_block(100, 2, 100), Block::Air);
}

#[test]
fn collision_follows_the_viewpoint() {
    let tally = Arc::new(Tally::new());
    let cfg = StreamConfig {
        collision_radius: 0,
        ..config(1)
    };
    let mut s = streamer(cfg, &tally);
    settle(&mut s, c(0, 0), 1);
    assert!(s.chunk(c(0, 0)).unwrap().collision().is_some());
    assert!(s.chunk(c(1, 0)).unwrap().collision().is_none());

    settle(&mut s, c(1, 0), 1);
    assert!(s.chunk(c(0, 0)).unwrap().collision().is_none());
    let col = s.chunk(c(1, 0)).unwrap().collision().unwrap();
    assert!(!col.is_empty());
}

/// Returns `len` cells of `block` with a fixed occupancy hint.
struct Fixed {
    block: Block,
    len: usize,
    occupancy: ChunkOccupancy,
}

impl ChunkGenerator for Fixed {
    fn seed(&self) -> i32 {
        0
    }
    fn generate(&self, _coord: ChunkCoord) -> ChunkGenerateResult {
        ChunkGenerateResult {
            blocks: vec![self.block; self.len],
            occupancy: self.occupancy,
        }
    }
}

#[test]
fn bad_generator_output_halts_the_tick() {
    for occupancy in [ChunkOccupancy::Populated, ChunkOccupancy::Empty] {
        let generator = Fixed {
            block: Block::Stone,
            len: 10,
            occupancy,
        };
        let mut s =
            ChunkStreamer::new(config(0), Arc::new(generator), Arc::new(BlockPalette::default()))
                .unwrap();
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            match s.update_loaded_chunks(c(0, 0), 0) {
                Ok(_) => {
                    assert!(Instant::now() < deadline, "contract violation never surfaced");
                    thread::sleep(Duration::from_millis(1));
                }
                Err(e) => {
                    assert!(matches!(e, StreamError::Contract(_)), "{occupancy:?}: {e}");
                    break;
                }
            }
        }
    }
}

#[test]
fn empty_hint_records_the_chunk_without_loading_it() {
    let generator = Fixed {
        block: Block::Air,
        len: strata_world::CHUNK_VOLUME,
        occupancy: ChunkOccupancy::Empty,
    };
    let mut s = ChunkStreamer::new(config(1), Arc::new(generator), Arc::new(BlockPalette::default()))
        .unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    while !s.is_idle() || s.empty_count() < 9 {
        s.update_loaded_chunks(c(0, 0), 1).unwrap();
        assert!(Instant::now() < deadline, "streamer did not settle");
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(s.loaded_count(), 0);
    assert_eq!(s.empty_count(), 9);
    assert_eq!(s.stats().empty_recorded, 9);
    assert!(s.is_chunk_ready(c(1, -1)));
}

#[test]
fn stream_config_loads_from_toml() {
    let cfg = StreamConfig::from_toml_str(
        r#"
        radius = 5
        vertical_layers = 2
        gen_budget = 3
        cache_evict_multiplier = 3.5
        "#,
    )
    .unwrap();
    assert_eq!(cfg.radius, 5);
    assert_eq!(cfg.gen_budget, 3);
    assert_eq!(cfg.mesh_budget, StreamConfig::default().mesh_budget);
    assert_eq!(cfg.gen_budget_for(1000), 6);
    assert_eq!(cfg.gen_budget_for(10), 3);
    assert!(StreamConfig::from_toml_str("gen_budget = 0").is_err());
    assert!(StreamConfig::from_toml_str("cache_evict_multiplier = 0.5").is_err());
}

#[test]
fn stream_config_bounds_the_window() {
    assert!(StreamConfig::from_toml_str(&format!("radius = {MAX_RADIUS}")).is_ok());
    assert!(StreamConfig::from_toml_str(&format!("radius = {}", MAX_RADIUS + 1)).is_err());
    assert!(StreamConfig::from_toml_str("radius = 2147483647").is_err());
    assert!(StreamConfig::from_toml_str("prefetch_width = 2147483647").is_err());
    assert!(StreamConfig::from_toml_str("hysteresis = 100000").is_err());
    assert!(StreamConfig::from_toml_str("vertical_layers = 100000").is_err());
    assert!(StreamConfig::from_toml_str("base_layer = 2147483647").is_err());
}
