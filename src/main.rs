mod flight;

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use strata_blocks::{Block, BlockPalette};
use strata_chunk::ChunkGenerator;
use strata_stream::{ChunkStreamer, StreamConfig, StreamError};
use strata_world::{World, WorldGenMode, worldgen};

use crate::flight::Flight;

#[derive(Parser, Debug)]
#[command(name = "strata", about = "Headless chunk streaming and meshing driver")]
struct Args {
    /// Streaming config (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Terrain parameters (TOML)
    #[arg(long)]
    worldgen: Option<PathBuf>,

    /// Block color overrides (TOML)
    #[arg(long)]
    palette: Option<PathBuf>,

    #[arg(long, default_value_t = 1337)]
    seed: i32,

    /// Flat world of this many cells instead of noise terrain
    #[arg(long)]
    flat: Option<i32>,

    /// Overrides the config radius
    #[arg(long)]
    radius: Option<i32>,

    #[arg(long, default_value_t = 600)]
    ticks: u32,

    /// Viewpoint speed in cells per tick along the flight heading
    #[arg(long, default_value_t = 2.0)]
    speed: f32,

    /// Flight heading in degrees, 0 = +X
    #[arg(long, default_value_t = 0.0)]
    heading: f32,

    /// Sleep between ticks in milliseconds
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    /// Log stats every N ticks
    #[arg(long, default_value_t = 60)]
    stats_every: u32,

    /// Place a marker block under the viewpoint every N ticks (0 = never)
    #[arg(long, default_value_t = 0)]
    edit_every: u32,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let mut cfg = match &args.config {
        Some(path) => StreamConfig::from_path(path)?,
        None => StreamConfig::default(),
    };
    if let Some(r) = args.radius {
        cfg.radius = r;
    }
    cfg.validate()?;

    let palette = match &args.palette {
        Some(path) => BlockPalette::from_path(path)?,
        None => BlockPalette::default(),
    };
    let mode = match args.flat {
        Some(thickness) => WorldGenMode::Flat { thickness },
        None => WorldGenMode::Normal,
    };
    let world = match &args.worldgen {
        Some(path) => World::with_params(args.seed, mode, worldgen::load_params_from_path(path)?),
        None => World::new(args.seed, mode),
    };
    let generator: Arc<dyn ChunkGenerator> = Arc::new(world);

    let radius = cfg.radius;
    log::info!(
        "strata: seed={} mode={:?} radius={} layers={} ticks={}",
        args.seed,
        mode,
        radius,
        cfg.vertical_layers,
        args.ticks
    );
    let mut streamer = ChunkStreamer::new(cfg, generator, Arc::new(palette))?;
    let mut flight = Flight::new(args.heading, args.speed);
    let started = Instant::now();
    let mut edits = 0u32;

    for tick in 0..args.ticks {
        let view = flight.chunk();
        streamer
            .update_loaded_chunks(view, radius)
            .map_err(|e| match e {
                StreamError::Contract(v) => format!("halting on contract violation: {v}"),
                other => other.to_string(),
            })?;

        if args.edit_every > 0 && tick % args.edit_every == 0 {
            let (wx, wz) = flight.cell();
            if streamer.set_block(wx, 1, wz, Block::Wood) {
                edits += 1;
            }
        }
        if args.stats_every > 0 && tick % args.stats_every == 0 {
            let st = streamer.stats();
            log::info!(
                "tick {tick} view=({}, {}) loaded={} empty={} cache={} prefetch={} queue={} gen={} mesh={} | gen_dispatched={} cache_hits={} prefetch_hits={} promoted={} meshes={} stale={} unloads={}",
                view.cx,
                view.cz,
                streamer.loaded_count(),
                streamer.empty_count(),
                streamer.block_cache_len(),
                streamer.prefetch_cache_len(),
                streamer.load_queue_len(),
                streamer.inflight_generation(),
                streamer.inflight_meshing(),
                st.gen_dispatched,
                st.block_cache_hits,
                st.prefetch_hits,
                st.prefetch_promoted,
                st.meshes_applied,
                st.stale_discards,
                st.unloads
            );
        }
        flight.advance();
        if args.tick_ms > 0 {
            std::thread::sleep(Duration::from_millis(args.tick_ms));
        }
    }

    let st = streamer.stats();
    let (quads, tris) = streamer.chunks().fold((0usize, 0usize), |(q, t), c| {
        let q = q + c.mesh().map_or(0, |m| m.quad_count());
        let t = t + c.collision().map_or(0, |col| col.triangle_count());
        (q, t)
    });
    log::info!(
        "done in {:.2?}: loaded={} quads={} collision_tris={} edits={} gen={} prefetch={} cache_hits={} prefetch_hits={} gen_ms={} mesh_ms={}",
        started.elapsed(),
        streamer.loaded_count(),
        quads,
        tris,
        edits,
        st.gen_dispatched,
        st.prefetch_dispatched,
        st.block_cache_hits,
        st.prefetch_hits,
        st.gen_ms_total,
        st.mesh_ms_total
    );
    Ok(())
}
