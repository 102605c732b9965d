use std::sync::Arc;

use fastnoise_lite::FastNoiseLite;

use crate::worldgen::WorldGenParams;

/// Noise samplers for one generation call. Built per job so workers share nothing.
pub struct GenCtx {
    pub height: FastNoiseLite,
    pub detail: FastNoiseLite,
    pub params: Arc<WorldGenParams>,
}
