use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use strata_mesh_cpu::MeshScratch;

/// Lock-free pool handing each mesh job its own `MeshScratch`.
pub struct MeshScratchPool {
    available_tx: Sender<MeshScratch>,
    available_rx: Receiver<MeshScratch>,
    allocated: AtomicUsize,
    max_scratch: usize,
}

impl MeshScratchPool {
    pub fn new(max_scratch: usize) -> Self {
        debug_assert!(max_scratch > 0);
        let (tx, rx) = bounded(max_scratch);
        Self {
            available_tx: tx,
            available_rx: rx,
            allocated: AtomicUsize::new(0),
            max_scratch,
        }
    }

    pub fn with_capacity_from_workers(worker_count: usize) -> Arc<Self> {
        Arc::new(Self::new(worker_count.max(1)))
    }

    /// Takes an idle scratch, allocating while under capacity, else waits for a release.
    pub fn acquire(&self) -> PooledScratch<'_> {
        if let Ok(scratch) = self.available_rx.try_recv() {
            return PooledScratch {
                scratch: Some(scratch),
                pool: self,
            };
        }

        loop {
            let current = self.allocated.load(Ordering::Acquire);
            if current < self.max_scratch {
                let prev = self.allocated.fetch_add(1, Ordering::AcqRel);
                if prev < self.max_scratch {
                    return PooledScratch {
                        scratch: Some(MeshScratch::new()),
                        pool: self,
                    };
                }
                self.allocated.fetch_sub(1, Ordering::AcqRel);
            }

            // The pool owns a sender, so this only wakes on a release.
            if let Ok(scratch) = self.available_rx.recv() {
                return PooledScratch {
                    scratch: Some(scratch),
                    pool: self,
                };
            }
        }
    }

    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Acquire)
    }

    pub fn idle(&self) -> usize {
        self.available_rx.len()
    }

    fn release(&self, scratch: MeshScratch) {
        let _ = self.available_tx.send(scratch);
    }
}

pub struct PooledScratch<'pool> {
    scratch: Option<MeshScratch>,
    pool: &'pool MeshScratchPool,
}

impl Deref for PooledScratch<'_> {
    type Target = MeshScratch;

    fn deref(&self) -> &Self::Target {
        self.scratch
            .as_ref()
            .expect("MeshScratch already released")
    }
}

impl DerefMut for PooledScratch<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.scratch
            .as_mut()
            .expect("MeshScratch already released")
    }
}

impl Drop for PooledScratch<'_> {
    fn drop(&mut self) {
        if let Some(scratch) = self.scratch.take() {
            self.pool.release(scratch);
        }
    }
}
