/// Running totals since the streamer was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub gen_dispatched: u64,
    pub prefetch_dispatched: u64,
    pub block_cache_hits: u64,
    pub prefetch_hits: u64,
    pub prefetch_promoted: u64,
    pub chunks_installed: u64,
    pub empty_recorded: u64,
    pub meshes_dispatched: u64,
    pub meshes_applied: u64,
    pub stale_discards: u64,
    pub unloads: u64,
    pub view_changes: u64,
    /// Worker time spent generating, including discarded results.
    pub gen_ms_total: u64,
    /// Worker time spent extracting surfaces, including discarded results.
    pub mesh_ms_total: u64,
}

/// What one `update_loaded_chunks` call did, plus queue depths after it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub view_changed: bool,
    pub gen_applied: usize,
    pub meshes_dispatched: usize,
    pub meshes_applied: usize,
    pub gen_dispatched: usize,
    pub cache_restored: usize,
    pub prefetch_dispatched: usize,
    pub unloaded: usize,
    pub loaded: usize,
    pub load_queue: usize,
    pub pending_mesh: usize,
    pub inflight_gen: usize,
    pub inflight_mesh: usize,
    pub inflight_prefetch: usize,
}

impl TickReport {
    pub fn did_work(&self) -> bool {
        self.view_changed
            || self.gen_applied > 0
            || self.meshes_dispatched > 0
            || self.meshes_applied > 0
            || self.gen_dispatched > 0
            || self.cache_restored > 0
            || self.prefetch_dispatched > 0
            || self.unloaded > 0
    }
}
