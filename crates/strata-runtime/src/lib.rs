//! Worker pool with a generation lane and a meshing lane.
#![forbid(unsafe_code)]

mod scratch_pool;

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TryRecvError, select, unbounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use strata_blocks::BlockPalette;
use strata_chunk::{BoundarySnapshot, CellData, ChunkGenerateResult, ChunkGenerator, ContractViolation};
use strata_mesh_cpu::{ChunkMeshCPU, extract_surfaces};
use strata_world::ChunkCoord;

pub use crate::scratch_pool::{MeshScratchPool, PooledScratch};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GenPurpose {
    /// The coordinate is in the desired window.
    Load,
    /// Speculative fill for the ring just outside the window.
    Prefetch,
}

#[derive(Clone, Debug)]
pub struct GenJob {
    pub coord: ChunkCoord,
    pub purpose: GenPurpose,
}

pub struct GenOut {
    pub coord: ChunkCoord,
    pub purpose: GenPurpose,
    pub result: ChunkGenerateResult,
    pub t_gen_ms: u32,
}

#[derive(Clone, Debug)]
pub struct MeshJob {
    pub coord: ChunkCoord,
    /// Chunk revision the cells were taken at.
    pub rev: u64,
    pub job_id: u64,
    pub cells: CellData,
    pub boundary: BoundarySnapshot,
}

pub struct MeshOut {
    pub coord: ChunkCoord,
    pub rev: u64,
    pub job_id: u64,
    pub result: Result<ChunkMeshCPU, ContractViolation>,
    pub t_mesh_ms: u32,
}

#[derive(Debug)]
pub enum RuntimeError {
    PoolBuild(rayon::ThreadPoolBuildError),
    /// Every worker has exited; no further results will arrive.
    WorkersGone,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::PoolBuild(e) => write!(f, "failed to build worker pool: {e}"),
            RuntimeError::WorkersGone => write!(f, "worker pool shut down"),
        }
    }
}

impl Error for RuntimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RuntimeError::PoolBuild(e) => Some(e),
            RuntimeError::WorkersGone => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueCounts {
    pub q_gen: usize,
    pub inflight_gen: usize,
    pub q_mesh: usize,
    pub inflight_mesh: usize,
}

#[inline]
fn elapsed_ms(t0: Instant) -> u32 {
    t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32
}

struct Worker {
    generator: Arc<dyn ChunkGenerator>,
    palette: Arc<BlockPalette>,
    scratch: Arc<MeshScratchPool>,
    gen_tx: Sender<GenOut>,
    mesh_tx: Sender<MeshOut>,
    q_gen: Arc<AtomicUsize>,
    q_mesh: Arc<AtomicUsize>,
    inflight_gen: Arc<AtomicUsize>,
    inflight_mesh: Arc<AtomicUsize>,
}

impl Worker {
    fn run_gen(&self, job: GenJob) {
        self.q_gen.fetch_sub(1, Ordering::Relaxed);
        self.inflight_gen.fetch_add(1, Ordering::Relaxed);
        let t0 = Instant::now();
        let result = self.generator.generate(job.coord);
        let _ = self.gen_tx.send(GenOut {
            coord: job.coord,
            purpose: job.purpose,
            result,
            t_gen_ms: elapsed_ms(t0),
        });
        self.inflight_gen.fetch_sub(1, Ordering::Relaxed);
    }

    fn run_mesh(&self, job: MeshJob) {
        self.q_mesh.fetch_sub(1, Ordering::Relaxed);
        self.inflight_mesh.fetch_add(1, Ordering::Relaxed);
        let t0 = Instant::now();
        let result = {
            let mut scratch = self.scratch.acquire();
            extract_surfaces(job.coord, &job.cells, &job.boundary, &self.palette, &mut scratch)
        };
        let _ = self.mesh_tx.send(MeshOut {
            coord: job.coord,
            rev: job.rev,
            job_id: job.job_id,
            result,
            t_mesh_ms: elapsed_ms(t0),
        });
        self.inflight_mesh.fetch_sub(1, Ordering::Relaxed);
    }

    // Meshing first: it unblocks visible geometry, generation only feeds more meshing.
    fn run(self, mesh_rx: Receiver<MeshJob>, gen_rx: Receiver<GenJob>) {
        loop {
            match mesh_rx.try_recv() {
                Ok(job) => {
                    self.run_mesh(job);
                    continue;
                }
                Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }
            match gen_rx.try_recv() {
                Ok(job) => {
                    self.run_gen(job);
                    continue;
                }
                Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }
            select! {
                recv(mesh_rx) -> res => match res {
                    Ok(job) => self.run_mesh(job),
                    Err(_) => break,
                },
                recv(gen_rx) -> res => match res {
                    Ok(job) => self.run_gen(job),
                    Err(_) => break,
                },
            }
        }
    }
}

pub struct Runtime {
    gen_job_tx: Sender<GenJob>,
    mesh_job_tx: Sender<MeshJob>,
    gen_res_rx: Receiver<GenOut>,
    mesh_res_rx: Receiver<MeshOut>,
    _pool: Arc<ThreadPool>,
    q_gen: Arc<AtomicUsize>,
    q_mesh: Arc<AtomicUsize>,
    inflight_gen: Arc<AtomicUsize>,
    inflight_mesh: Arc<AtomicUsize>,
    scratch_pool: Arc<MeshScratchPool>,
    pub workers: usize,
}

impl Runtime {
    /// Starts `workers` threads (0 means one per available core).
    pub fn new(
        generator: Arc<dyn ChunkGenerator>,
        palette: Arc<BlockPalette>,
        workers: usize,
    ) -> Result<Self, RuntimeError> {
        let workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            workers
        };
        let (gen_job_tx, gen_job_rx) = unbounded::<GenJob>();
        let (mesh_job_tx, mesh_job_rx) = unbounded::<MeshJob>();
        let (gen_res_tx, gen_res_rx) = unbounded::<GenOut>();
        let (mesh_res_tx, mesh_res_rx) = unbounded::<MeshOut>();

        let q_gen = Arc::new(AtomicUsize::new(0));
        let q_mesh = Arc::new(AtomicUsize::new(0));
        let inflight_gen = Arc::new(AtomicUsize::new(0));
        let inflight_mesh = Arc::new(AtomicUsize::new(0));
        let scratch_pool = MeshScratchPool::with_capacity_from_workers(workers);

        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("strata-worker-{i}"))
                .build()
                .map_err(RuntimeError::PoolBuild)?,
        );
        for _ in 0..workers {
            let worker = Worker {
                generator: Arc::clone(&generator),
                palette: Arc::clone(&palette),
                scratch: Arc::clone(&scratch_pool),
                gen_tx: gen_res_tx.clone(),
                mesh_tx: mesh_res_tx.clone(),
                q_gen: Arc::clone(&q_gen),
                q_mesh: Arc::clone(&q_mesh),
                inflight_gen: Arc::clone(&inflight_gen),
                inflight_mesh: Arc::clone(&inflight_mesh),
            };
            let mesh_rx = mesh_job_rx.clone();
            let gen_rx = gen_job_rx.clone();
            pool.spawn(move || worker.run(mesh_rx, gen_rx));
        }
        log::info!(
            target: "runtime",
            "worker pool started: workers={} seed={}",
            workers,
            generator.seed()
        );

        Ok(Self {
            gen_job_tx,
            mesh_job_tx,
            gen_res_rx,
            mesh_res_rx,
            _pool: pool,
            q_gen,
            q_mesh,
            inflight_gen,
            inflight_mesh,
            scratch_pool,
            workers,
        })
    }

    pub fn submit_gen(&self, job: GenJob) -> Result<(), RuntimeError> {
        self.q_gen.fetch_add(1, Ordering::Relaxed);
        if self.gen_job_tx.send(job).is_err() {
            self.q_gen.fetch_sub(1, Ordering::Relaxed);
            return Err(RuntimeError::WorkersGone);
        }
        Ok(())
    }

    pub fn submit_mesh(&self, job: MeshJob) -> Result<(), RuntimeError> {
        self.q_mesh.fetch_add(1, Ordering::Relaxed);
        if self.mesh_job_tx.send(job).is_err() {
            self.q_mesh.fetch_sub(1, Ordering::Relaxed);
            return Err(RuntimeError::WorkersGone);
        }
        Ok(())
    }

    /// Next finished generation, if any. Results not taken stay queued.
    pub fn try_recv_gen(&self) -> Result<Option<GenOut>, RuntimeError> {
        match self.gen_res_rx.try_recv() {
            Ok(out) => Ok(Some(out)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(RuntimeError::WorkersGone),
        }
    }

    /// Next finished mesh, if any. Results not taken stay queued.
    pub fn try_recv_mesh(&self) -> Result<Option<MeshOut>, RuntimeError> {
        match self.mesh_res_rx.try_recv() {
            Ok(out) => Ok(Some(out)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(RuntimeError::WorkersGone),
        }
    }

    pub fn queue_debug_counts(&self) -> QueueCounts {
        QueueCounts {
            q_gen: self.q_gen.load(Ordering::Relaxed),
            inflight_gen: self.inflight_gen.load(Ordering::Relaxed),
            q_mesh: self.q_mesh.load(Ordering::Relaxed),
            inflight_mesh: self.inflight_mesh.load(Ordering::Relaxed),
        }
    }

    pub fn scratch_pool(&self) -> &MeshScratchPool {
        &self.scratch_pool
    }
}
