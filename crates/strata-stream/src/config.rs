use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

/// Largest accepted streaming radius, hysteresis, or prefetch width, in chunks.
pub const MAX_RADIUS: i32 = 128;
/// Largest accepted number of vertical layers.
pub const MAX_VERTICAL_LAYERS: i32 = 64;

/// Streaming window, budgets, and cache radii. Distances are in chunks, measured in plan.
#[derive(Clone, Debug, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_radius")]
    pub radius: i32,
    #[serde(default = "default_vertical_layers")]
    pub vertical_layers: i32,
    /// Lowest chunk layer (cy) of the window.
    #[serde(default)]
    pub base_layer: i32,
    #[serde(default = "default_hysteresis")]
    pub hysteresis: i32,
    /// Generation jobs in flight.
    #[serde(default = "default_gen_budget")]
    pub gen_budget: usize,
    #[serde(default = "default_gen_burst_multiplier")]
    pub gen_burst_multiplier: usize,
    /// Load queue length above which the burst multiplier applies.
    #[serde(default = "default_burst_backlog")]
    pub burst_backlog: usize,
    /// Mesh jobs in flight.
    #[serde(default = "default_mesh_budget")]
    pub mesh_budget: usize,
    #[serde(default = "default_apply_per_tick")]
    pub gen_apply_per_tick: usize,
    #[serde(default = "default_apply_per_tick")]
    pub mesh_apply_per_tick: usize,
    #[serde(default = "default_prefetch_width")]
    pub prefetch_width: i32,
    #[serde(default = "default_prefetch_per_tick")]
    pub prefetch_per_tick: usize,
    #[serde(default = "default_max_inflight_prefetch")]
    pub max_inflight_prefetch: usize,
    /// Block-cache and empty-set entries survive up to `radius * cache_evict_multiplier`.
    #[serde(default = "default_cache_evict_multiplier")]
    pub cache_evict_multiplier: f32,
    #[serde(default = "default_collision_radius")]
    pub collision_radius: i32,
    /// Worker threads; 0 picks one per core.
    #[serde(default)]
    pub workers: usize,
}

fn default_radius() -> i32 {
    8
}
fn default_vertical_layers() -> i32 {
    4
}
fn default_hysteresis() -> i32 {
    2
}
fn default_gen_budget() -> usize {
    8
}
fn default_gen_burst_multiplier() -> usize {
    2
}
fn default_burst_backlog() -> usize {
    64
}
fn default_mesh_budget() -> usize {
    8
}
fn default_apply_per_tick() -> usize {
    16
}
fn default_prefetch_width() -> i32 {
    2
}
fn default_prefetch_per_tick() -> usize {
    4
}
fn default_max_inflight_prefetch() -> usize {
    8
}
fn default_cache_evict_multiplier() -> f32 {
    2.0
}
fn default_collision_radius() -> i32 {
    2
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            vertical_layers: default_vertical_layers(),
            base_layer: 0,
            hysteresis: default_hysteresis(),
            gen_budget: default_gen_budget(),
            gen_burst_multiplier: default_gen_burst_multiplier(),
            burst_backlog: default_burst_backlog(),
            mesh_budget: default_mesh_budget(),
            gen_apply_per_tick: default_apply_per_tick(),
            mesh_apply_per_tick: default_apply_per_tick(),
            prefetch_width: default_prefetch_width(),
            prefetch_per_tick: default_prefetch_per_tick(),
            max_inflight_prefetch: default_max_inflight_prefetch(),
            cache_evict_multiplier: default_cache_evict_multiplier(),
            collision_radius: default_collision_radius(),
            workers: 0,
        }
    }
}

impl StreamConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: StreamConfig = toml::from_str(toml_str)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if !(0..=MAX_RADIUS).contains(&self.radius) {
            return Err(format!("radius must be in 0..={MAX_RADIUS}, got {}", self.radius).into());
        }
        if !(1..=MAX_VERTICAL_LAYERS).contains(&self.vertical_layers) {
            return Err(format!(
                "vertical_layers must be in 1..={MAX_VERTICAL_LAYERS}, got {}",
                self.vertical_layers
            )
            .into());
        }
        if !(0..=MAX_RADIUS).contains(&self.hysteresis)
            || !(0..=MAX_RADIUS).contains(&self.prefetch_width)
        {
            return Err(format!("hysteresis and prefetch_width must be in 0..={MAX_RADIUS}").into());
        }
        if self.base_layer.checked_add(self.vertical_layers).is_none() {
            return Err(format!("base_layer {} is out of range", self.base_layer).into());
        }
        if self.gen_budget == 0 || self.mesh_budget == 0 {
            return Err("gen_budget and mesh_budget must be >= 1".into());
        }
        if self.gen_apply_per_tick == 0 || self.mesh_apply_per_tick == 0 {
            return Err("per-tick apply budgets must be >= 1".into());
        }
        if self.gen_burst_multiplier == 0 {
            return Err("gen_burst_multiplier must be >= 1".into());
        }
        if self.cache_evict_multiplier.is_nan() || self.cache_evict_multiplier < 1.0 {
            return Err(format!(
                "cache_evict_multiplier must be >= 1.0, got {}",
                self.cache_evict_multiplier
            )
            .into());
        }
        Ok(())
    }

    /// Generation budget for a load queue of `backlog` entries.
    pub fn gen_budget_for(&self, backlog: usize) -> usize {
        if backlog > self.burst_backlog {
            self.gen_budget * self.gen_burst_multiplier
        } else {
            self.gen_budget
        }
    }

    pub(crate) fn evict_radius(&self, radius: i32) -> i32 {
        (radius as f32 * self.cache_evict_multiplier).ceil() as i32
    }
}
