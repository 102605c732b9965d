use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WorldGenConfig {
    #[serde(default)]
    pub height: Height,
    #[serde(default)]
    pub surface: Surface,
    #[serde(default)]
    pub water: Water,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Height {
    #[serde(default = "default_height_freq")]
    pub frequency: f32,
    #[serde(default = "default_detail_freq")]
    pub detail_frequency: f32,
    #[serde(default = "default_detail_amp")]
    pub detail_amplitude: f32,
    #[serde(default = "default_min_y")]
    pub min_y: i32,
    #[serde(default = "default_max_y")]
    pub max_y: i32,
}
fn default_height_freq() -> f32 {
    0.008
}
fn default_detail_freq() -> f32 {
    0.05
}
fn default_detail_amp() -> f32 {
    3.0
}
fn default_min_y() -> i32 {
    8
}
fn default_max_y() -> i32 {
    52
}
impl Default for Height {
    fn default() -> Self {
        Self {
            frequency: default_height_freq(),
            detail_frequency: default_detail_freq(),
            detail_amplitude: default_detail_amp(),
            min_y: default_min_y(),
            max_y: default_max_y(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Surface {
    #[serde(default = "default_topsoil")]
    pub topsoil_thickness: i32,
    #[serde(default = "default_snow_line")]
    pub snow_line: i32,
    #[serde(default = "default_beach_band")]
    pub beach_band: i32,
}
fn default_topsoil() -> i32 {
    3
}
fn default_snow_line() -> i32 {
    46
}
fn default_beach_band() -> i32 {
    1
}
impl Default for Surface {
    fn default() -> Self {
        Self {
            topsoil_thickness: default_topsoil(),
            snow_line: default_snow_line(),
            beach_band: default_beach_band(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Water {
    #[serde(default = "default_water_enable")]
    pub enable: bool,
    #[serde(default = "default_water_level")]
    pub level: i32,
}
fn default_water_enable() -> bool {
    true
}
fn default_water_level() -> i32 {
    18
}
impl Default for Water {
    fn default() -> Self {
        Self {
            enable: default_water_enable(),
            level: default_water_level(),
        }
    }
}

/// Resolved parameters used at generation time.
pub type WorldGenParams = WorldGenConfig;

impl WorldGenConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: WorldGenConfig = toml::from_str(toml_str)?;
        if cfg.height.max_y < cfg.height.min_y {
            return Err(format!(
                "height.max_y ({}) is below height.min_y ({})",
                cfg.height.max_y, cfg.height.min_y
            )
            .into());
        }
        Ok(cfg)
    }
}

pub fn load_params_from_path(path: impl AsRef<Path>) -> Result<WorldGenParams, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    WorldGenConfig::from_toml_str(&s)
}
