use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use strata_blocks::{Block, BlockPalette};
use strata_chunk::{
    BoundarySnapshot, CellData, ChunkBuf, ChunkGenerateResult, ChunkGenerator, ContractViolation,
    Face,
};
use strata_mesh_cpu::ChunkMeshCPU;
use strata_runtime::{GenJob, GenOut, GenPurpose, MeshJob, Runtime};
use strata_world::{CHUNK_SIZE, CHUNK_VOLUME, ChunkCoord};

use crate::chunk::Chunk;
use crate::config::{MAX_RADIUS, StreamConfig};
use crate::error::StreamError;
use crate::stats::{StreamStats, TickReport};

/// Drives the per-tick load, mesh, and unload pipeline for one world.
///
/// All bookkeeping lives here and is touched only by the thread calling
/// `update_loaded_chunks`; workers see owned job inputs and answer through the
/// runtime's result channels.
pub struct ChunkStreamer {
    cfg: StreamConfig,
    runtime: Runtime,

    chunks: HashMap<ChunkCoord, Chunk>,
    center: Option<(i32, i32)>,
    radius: i32,

    load_queue: VecDeque<ChunkCoord>,
    // Every load job still running, abandoned or not.
    inflight_gen: HashSet<ChunkCoord>,
    abandoned: HashSet<ChunkCoord>,

    pending_mesh: VecDeque<ChunkCoord>,
    pending_mesh_set: HashSet<ChunkCoord>,
    // coord -> id of the mesh job whose result will be accepted.
    inflight_mesh: HashMap<ChunkCoord, u64>,
    mesh_jobs_running: usize,
    next_mesh_job: u64,

    empty: HashSet<ChunkCoord>,
    block_cache: HashMap<ChunkCoord, CellData>,

    prefetch_queue: VecDeque<ChunkCoord>,
    prefetch_cache: HashMap<ChunkCoord, CellData>,
    // Every prefetch job still running; the two sets below are subsets.
    inflight_prefetch: HashSet<ChunkCoord>,
    abandoned_prefetch: HashSet<ChunkCoord>,
    promoted_prefetch: HashSet<ChunkCoord>,

    stats: StreamStats,
}

impl ChunkStreamer {
    pub fn new(
        cfg: StreamConfig,
        generator: Arc<dyn ChunkGenerator>,
        palette: Arc<BlockPalette>,
    ) -> Result<Self, StreamError> {
        let runtime = Runtime::new(generator, palette, cfg.workers)?;
        let radius = cfg.radius;
        Ok(Self {
            cfg,
            runtime,
            chunks: HashMap::new(),
            center: None,
            radius,
            load_queue: VecDeque::new(),
            inflight_gen: HashSet::new(),
            abandoned: HashSet::new(),
            pending_mesh: VecDeque::new(),
            pending_mesh_set: HashSet::new(),
            inflight_mesh: HashMap::new(),
            mesh_jobs_running: 0,
            next_mesh_job: 0,
            empty: HashSet::new(),
            block_cache: HashMap::new(),
            prefetch_queue: VecDeque::new(),
            prefetch_cache: HashMap::new(),
            inflight_prefetch: HashSet::new(),
            abandoned_prefetch: HashSet::new(),
            promoted_prefetch: HashSet::new(),
            stats: StreamStats::default(),
        })
    }

    /// Runs one tick of the pipeline around the viewpoint chunk.
    ///
    /// Only the plan position (`cx`, `cz`) of `viewpoint` matters; the window
    /// covers `vertical_layers` layers from `base_layer`. `radius` is clamped
    /// to `0..=MAX_RADIUS`.
    pub fn update_loaded_chunks(
        &mut self,
        viewpoint: ChunkCoord,
        radius: i32,
    ) -> Result<TickReport, StreamError> {
        let mut report = TickReport::default();
        let plan = (viewpoint.cx, viewpoint.cz);
        let radius = radius.clamp(0, MAX_RADIUS);
        if self.center != Some(plan) || self.radius != radius {
            let moved = self.center != Some(plan);
            self.center = Some(plan);
            self.radius = radius;
            report.unloaded = self.recompute_window(moved);
            report.view_changed = true;
        }

        report.gen_applied = self.apply_gen_results()?;
        report.meshes_dispatched = self.dispatch_meshes()?;
        report.meshes_applied = self.apply_mesh_results()?;
        let (dispatched, restored) = self.dispatch_loads()?;
        report.gen_dispatched = dispatched;
        report.cache_restored = restored;
        report.prefetch_dispatched = self.dispatch_prefetch()?;

        report.loaded = self.chunks.len();
        report.load_queue = self.load_queue.len();
        report.pending_mesh = self.pending_mesh.len();
        report.inflight_gen = self.inflight_gen.len();
        report.inflight_mesh = self.mesh_jobs_running;
        report.inflight_prefetch = self.inflight_prefetch.len();
        if report.did_work() {
            log::debug!(
                target: "stream",
                "tick: gen_applied={} mesh_dispatched={} mesh_applied={} gen_dispatched={} restored={} prefetch={} loaded={} queue={} inflight_gen={} inflight_mesh={}",
                report.gen_applied,
                report.meshes_dispatched,
                report.meshes_applied,
                report.gen_dispatched,
                report.cache_restored,
                report.prefetch_dispatched,
                report.loaded,
                report.load_queue,
                report.inflight_gen,
                report.inflight_mesh
            );
        }
        Ok(report)
    }

    /// Loaded with geometry applied, or known to be empty.
    pub fn is_chunk_ready(&self, coord: ChunkCoord) -> bool {
        if self.empty.contains(&coord) {
            return true;
        }
        self.chunks.get(&coord).is_some_and(Chunk::has_mesh)
    }

    /// Cell at a world position; `Air` when its chunk is not loaded.
    pub fn get_block(&self, wx: i32, wy: i32, wz: i32) -> Block {
        let (coord, (lx, ly, lz)) = ChunkCoord::from_world(wx, wy, wz);
        self.chunks
            .get(&coord)
            .map_or(Block::Air, |c| c.get(lx, ly, lz))
    }

    /// Writes a cell in a loaded (or known-empty) chunk and queues the remeshes
    /// it needs. Returns false when nothing changed.
    pub fn set_block(&mut self, wx: i32, wy: i32, wz: i32, block: Block) -> bool {
        let (coord, (lx, ly, lz)) = ChunkCoord::from_world(wx, wy, wz);
        if self.empty.contains(&coord) {
            if block.is_air() {
                return false;
            }
            self.empty.remove(&coord);
            let enabled = self.collision_eligible(coord);
            self.chunks
                .insert(coord, Chunk::new(ChunkBuf::new_empty(coord), enabled));
        }
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return false;
        };
        if !chunk.set(lx, ly, lz, block) {
            return false;
        }

        if chunk.is_empty() {
            self.chunks.remove(&coord);
            self.inflight_mesh.remove(&coord);
            self.empty.insert(coord);
            for face in Face::ALL {
                let (dx, dy, dz) = face.delta();
                self.queue_mesh_if_loaded(coord.offset(dx, dy, dz));
            }
            return true;
        }
        self.queue_mesh(coord);

        let last = CHUNK_SIZE - 1;
        let edges = [
            (lx == 0, (-1, 0, 0)),
            (lx == last, (1, 0, 0)),
            (ly == 0, (0, -1, 0)),
            (ly == last, (0, 1, 0)),
            (lz == 0, (0, 0, -1)),
            (lz == last, (0, 0, 1)),
        ];
        for (on_edge, (dx, dy, dz)) in edges {
            if on_edge {
                self.queue_mesh_if_loaded(coord.offset(dx, dy, dz));
            }
        }
        true
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    #[inline]
    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    #[inline]
    pub fn is_known_empty(&self, coord: ChunkCoord) -> bool {
        self.empty.contains(&coord)
    }

    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn empty_count(&self) -> usize {
        self.empty.len()
    }

    pub fn block_cache_len(&self) -> usize {
        self.block_cache.len()
    }

    pub fn prefetch_cache_len(&self) -> usize {
        self.prefetch_cache.len()
    }

    /// Load-lane generation jobs currently running.
    pub fn inflight_generation(&self) -> usize {
        self.inflight_gen.len()
    }

    pub fn inflight_meshing(&self) -> usize {
        self.mesh_jobs_running
    }

    pub fn inflight_prefetch(&self) -> usize {
        self.inflight_prefetch.len()
    }

    pub fn load_queue_len(&self) -> usize {
        self.load_queue.len()
    }

    /// Nothing queued, nothing running.
    pub fn is_idle(&self) -> bool {
        self.load_queue.is_empty()
            && self.pending_mesh.is_empty()
            && self.prefetch_queue.is_empty()
            && self.inflight_gen.is_empty()
            && self.inflight_prefetch.is_empty()
            && self.mesh_jobs_running == 0
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    pub fn config(&self) -> &StreamConfig {
        &self.cfg
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    // Plan position of the viewpoint; the layer is irrelevant to plan distances.
    fn center_coord(&self) -> ChunkCoord {
        let (cx, cz) = self.center.unwrap_or((0, 0));
        ChunkCoord::new(cx, 0, cz)
    }

    fn plan_distance(&self, coord: ChunkCoord) -> i32 {
        coord.plan_distance(self.center_coord())
    }

    fn layer_range(&self) -> std::ops::Range<i32> {
        self.cfg.base_layer..self.cfg.base_layer + self.cfg.vertical_layers
    }

    fn collision_eligible(&self, coord: ChunkCoord) -> bool {
        self.plan_distance(coord) <= self.cfg.collision_radius
    }

    // Chunks in the plan ring `lo..=hi` around the center, nearest first.
    fn window(&self, lo: i32, hi: i32) -> Vec<ChunkCoord> {
        let center = self.center_coord();
        let (cx, cz) = (center.cx, center.cz);
        let mut out = Vec::new();
        for dz in -hi..=hi {
            for dx in -hi..=hi {
                let d = dx.abs().max(dz.abs());
                if d < lo {
                    continue;
                }
                for cy in self.layer_range() {
                    out.push(ChunkCoord::new(cx + dx, cy, cz + dz));
                }
            }
        }
        let base = self.cfg.base_layer;
        out.sort_by_key(|c| {
            let (dx, dz) = (i64::from(c.cx - cx), i64::from(c.cz - cz));
            (c.plan_distance(center), dx * dx + dz * dz, (c.cy - base).abs(), c.cx, c.cz)
        });
        out
    }

    fn is_loading(&self, coord: ChunkCoord) -> bool {
        (self.inflight_gen.contains(&coord) && !self.abandoned.contains(&coord))
            || self.promoted_prefetch.contains(&coord)
    }

    /// Diffs the new window against current state. Returns the number unloaded.
    fn recompute_window(&mut self, moved: bool) -> usize {
        let r = self.radius;
        let keep = r + self.cfg.hysteresis;
        let evict = self.cfg.evict_radius(r);
        let prefetch_keep = r + self.cfg.prefetch_width + 1;
        self.stats.view_changes += 1;

        let unload: Vec<ChunkCoord> = self
            .chunks
            .keys()
            .copied()
            .filter(|c| self.plan_distance(*c) > keep)
            .collect();
        for coord in &unload {
            self.unload(*coord);
        }

        let abandon: Vec<ChunkCoord> = self
            .inflight_gen
            .iter()
            .copied()
            .filter(|c| self.plan_distance(*c) > keep)
            .collect();
        self.abandoned.extend(abandon);

        let demote: Vec<ChunkCoord> = self
            .promoted_prefetch
            .iter()
            .copied()
            .filter(|c| self.plan_distance(*c) > keep)
            .collect();
        for coord in demote {
            self.promoted_prefetch.remove(&coord);
        }

        let center = self.center_coord();
        self.block_cache.retain(|c, _| c.plan_distance(center) <= evict);
        self.empty.retain(|c| c.plan_distance(center) <= evict);
        self.prefetch_cache
            .retain(|c, _| c.plan_distance(center) <= prefetch_keep);
        let cancel: Vec<ChunkCoord> = self
            .inflight_prefetch
            .iter()
            .copied()
            .filter(|c| c.plan_distance(center) > prefetch_keep)
            .collect();
        for coord in cancel {
            self.promoted_prefetch.remove(&coord);
            self.abandoned_prefetch.insert(coord);
        }

        self.load_queue.clear();
        for coord in self.window(0, r) {
            if self.abandoned.remove(&coord) {
                // Back in range before its result arrived.
                continue;
            }
            if self.chunks.contains_key(&coord)
                || self.empty.contains(&coord)
                || self.is_loading(coord)
            {
                continue;
            }
            self.load_queue.push_back(coord);
        }

        self.prefetch_queue.clear();
        if self.cfg.prefetch_width > 0 {
            for coord in self.window(r + 1, r + self.cfg.prefetch_width) {
                self.abandoned_prefetch.remove(&coord);
                self.prefetch_queue.push_back(coord);
            }
        }

        if moved {
            let collide = self.cfg.collision_radius;
            for chunk in self.chunks.values_mut() {
                let c = chunk.coord();
                chunk.set_collision_enabled(c.plan_distance(center) <= collide);
            }
        }

        log::info!(
            target: "stream",
            "view center ({}, {}) r={}: queued={} prefetch_ring={} unloaded={} abandoned={} cache={} prefetch_cache={} empty={}",
            center.cx,
            center.cz,
            r,
            self.load_queue.len(),
            self.prefetch_queue.len(),
            unload.len(),
            self.abandoned.len(),
            self.block_cache.len(),
            self.prefetch_cache.len(),
            self.empty.len()
        );
        unload.len()
    }

    fn unload(&mut self, coord: ChunkCoord) {
        if let Some(chunk) = self.chunks.remove(&coord) {
            let cells = chunk.into_buf().snapshot_for_cache();
            self.block_cache.insert(coord, cells);
            self.inflight_mesh.remove(&coord);
            self.stats.unloads += 1;
        }
    }

    /// Installs generated or cached cells: empty chunks go to the empty set,
    /// others are loaded and queued for meshing along with their neighbors.
    fn install(&mut self, coord: ChunkCoord, cells: CellData) -> Result<(), StreamError> {
        let buf = ChunkBuf::from_cells(coord, cells)?;
        if buf.is_empty() {
            self.empty.insert(coord);
            self.stats.empty_recorded += 1;
            return Ok(());
        }
        let enabled = self.collision_eligible(coord);
        self.chunks.insert(coord, Chunk::new(buf, enabled));
        self.stats.chunks_installed += 1;
        self.queue_mesh(coord);
        for face in Face::ALL {
            let (dx, dy, dz) = face.delta();
            self.queue_mesh_if_loaded(coord.offset(dx, dy, dz));
        }
        Ok(())
    }

    fn queue_mesh(&mut self, coord: ChunkCoord) {
        if self.pending_mesh_set.insert(coord) {
            self.pending_mesh.push_back(coord);
        }
    }

    fn queue_mesh_if_loaded(&mut self, coord: ChunkCoord) {
        if self.chunks.contains_key(&coord) {
            self.queue_mesh(coord);
        }
    }

    fn apply_gen_results(&mut self) -> Result<usize, StreamError> {
        let mut applied = 0;
        while applied < self.cfg.gen_apply_per_tick {
            let Some(out) = self.runtime.try_recv_gen()? else {
                break;
            };
            applied += 1;
            self.stats.gen_ms_total += u64::from(out.t_gen_ms);
            match out.purpose {
                GenPurpose::Load => self.apply_load_result(out)?,
                GenPurpose::Prefetch => self.apply_prefetch_result(out)?,
            }
        }
        Ok(applied)
    }

    fn apply_load_result(&mut self, out: GenOut) -> Result<(), StreamError> {
        let coord = out.coord;
        self.inflight_gen.remove(&coord);
        if self.abandoned.remove(&coord) {
            self.stats.stale_discards += 1;
            log::trace!(target: "stream", "discard abandoned generation {:?}", coord);
            return Ok(());
        }
        if self.chunks.contains_key(&coord) || self.empty.contains(&coord) {
            self.stats.stale_discards += 1;
            return Ok(());
        }
        self.install_generated(coord, out.result)
    }

    fn apply_prefetch_result(&mut self, out: GenOut) -> Result<(), StreamError> {
        let coord = out.coord;
        self.inflight_prefetch.remove(&coord);
        if self.abandoned_prefetch.remove(&coord) {
            self.stats.stale_discards += 1;
            log::trace!(target: "stream", "discard abandoned prefetch {:?}", coord);
            return Ok(());
        }
        if self.promoted_prefetch.remove(&coord) {
            if self.chunks.contains_key(&coord) || self.empty.contains(&coord) {
                return Ok(());
            }
            return self.install_generated(coord, out.result);
        }
        check_cell_count(coord, out.result.blocks.len())?;
        self.prefetch_cache
            .insert(coord, Arc::from(out.result.blocks));
        Ok(())
    }

    /// Installs a fresh generation result, trusting an `Empty` hint so the
    /// cells need not be scanned.
    fn install_generated(
        &mut self,
        coord: ChunkCoord,
        result: ChunkGenerateResult,
    ) -> Result<(), StreamError> {
        if result.occupancy.is_empty() {
            check_cell_count(coord, result.blocks.len())?;
            self.empty.insert(coord);
            self.stats.empty_recorded += 1;
            return Ok(());
        }
        self.install(coord, Arc::from(result.blocks))
    }

    fn dispatch_meshes(&mut self) -> Result<usize, StreamError> {
        let mut dispatched = 0;
        let mut deferred = Vec::new();
        while self.mesh_jobs_running < self.cfg.mesh_budget {
            let Some(coord) = self.pending_mesh.pop_front() else {
                break;
            };
            self.pending_mesh_set.remove(&coord);
            let Some(chunk) = self.chunks.get_mut(&coord) else {
                continue;
            };
            if self.inflight_mesh.contains_key(&coord) {
                // One job per chunk at a time; retry once it lands.
                deferred.push(coord);
                continue;
            }
            if chunk.is_empty() {
                chunk.set_mesh(ChunkMeshCPU::empty(coord));
                continue;
            }
            let rev = chunk.revision();
            let cells = Arc::clone(chunk.buf().cells());
            let job = MeshJob {
                coord,
                rev,
                job_id: self.next_mesh_job,
                cells,
                boundary: self.boundary_snapshot(coord),
            };
            self.next_mesh_job += 1;
            self.inflight_mesh.insert(coord, job.job_id);
            self.runtime.submit_mesh(job)?;
            self.mesh_jobs_running += 1;
            self.stats.meshes_dispatched += 1;
            dispatched += 1;
        }
        for coord in deferred {
            self.queue_mesh(coord);
        }
        Ok(dispatched)
    }

    fn boundary_snapshot(&self, coord: ChunkCoord) -> BoundarySnapshot {
        let mut snap = BoundarySnapshot::new();
        for face in Face::ALL {
            let (dx, dy, dz) = face.delta();
            if let Some(neighbor) = self.chunks.get(&coord.offset(dx, dy, dz)) {
                snap.set(face, neighbor.buf().face_slice(face.opposite()));
            }
        }
        snap
    }

    fn apply_mesh_results(&mut self) -> Result<usize, StreamError> {
        let mut applied = 0;
        while applied < self.cfg.mesh_apply_per_tick {
            let Some(out) = self.runtime.try_recv_mesh()? else {
                break;
            };
            self.mesh_jobs_running = self.mesh_jobs_running.saturating_sub(1);
            self.stats.mesh_ms_total += u64::from(out.t_mesh_ms);
            let mesh = out.result?;
            if self.inflight_mesh.get(&out.coord) != Some(&out.job_id) {
                self.stats.stale_discards += 1;
                log::trace!(target: "stream", "discard mesh for unloaded {:?}", out.coord);
                continue;
            }
            self.inflight_mesh.remove(&out.coord);
            let Some(chunk) = self.chunks.get_mut(&out.coord) else {
                continue;
            };
            if chunk.revision() != out.rev {
                self.stats.stale_discards += 1;
                log::trace!(
                    target: "stream",
                    "discard mesh rev {} for {:?} (now {})",
                    out.rev,
                    out.coord,
                    chunk.revision()
                );
                continue;
            }
            chunk.set_mesh(mesh);
            self.stats.meshes_applied += 1;
            applied += 1;
        }
        Ok(applied)
    }

    /// Returns (generation jobs dispatched, chunks restored from a cache).
    fn dispatch_loads(&mut self) -> Result<(usize, usize), StreamError> {
        let budget = self.cfg.gen_budget_for(self.load_queue.len());
        let mut dispatched = 0;
        let mut restored = 0;
        while self.inflight_gen.len() < budget {
            let Some(coord) = self.load_queue.pop_front() else {
                break;
            };
            if self.chunks.contains_key(&coord)
                || self.empty.contains(&coord)
                || self.is_loading(coord)
            {
                continue;
            }
            if let Some(cells) = self.block_cache.remove(&coord) {
                self.stats.block_cache_hits += 1;
                self.install(coord, cells)?;
                restored += 1;
                continue;
            }
            if let Some(cells) = self.prefetch_cache.remove(&coord) {
                self.stats.prefetch_hits += 1;
                self.install(coord, cells)?;
                restored += 1;
                continue;
            }
            if self.inflight_prefetch.contains(&coord) {
                self.abandoned_prefetch.remove(&coord);
                self.promoted_prefetch.insert(coord);
                self.stats.prefetch_promoted += 1;
                continue;
            }
            self.runtime.submit_gen(GenJob {
                coord,
                purpose: GenPurpose::Load,
            })?;
            self.inflight_gen.insert(coord);
            self.stats.gen_dispatched += 1;
            dispatched += 1;
        }
        Ok((dispatched, restored))
    }

    fn dispatch_prefetch(&mut self) -> Result<usize, StreamError> {
        let mut dispatched = 0;
        while dispatched < self.cfg.prefetch_per_tick
            && self.inflight_prefetch.len() < self.cfg.max_inflight_prefetch
        {
            let Some(coord) = self.prefetch_queue.pop_front() else {
                break;
            };
            if self.chunks.contains_key(&coord)
                || self.empty.contains(&coord)
                || self.block_cache.contains_key(&coord)
                || self.prefetch_cache.contains_key(&coord)
                || self.inflight_gen.contains(&coord)
                || self.inflight_prefetch.contains(&coord)
            {
                continue;
            }
            self.runtime.submit_gen(GenJob {
                coord,
                purpose: GenPurpose::Prefetch,
            })?;
            self.inflight_prefetch.insert(coord);
            self.stats.prefetch_dispatched += 1;
            dispatched += 1;
        }
        Ok(dispatched)
    }
}

fn check_cell_count(coord: ChunkCoord, got: usize) -> Result<(), ContractViolation> {
    if got != CHUNK_VOLUME {
        return Err(ContractViolation::CellCount {
            coord,
            expected: CHUNK_VOLUME,
            got,
        });
    }
    Ok(())
}
