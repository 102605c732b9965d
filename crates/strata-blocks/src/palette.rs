use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::types::{Block, FaceRole};

pub type Rgba = [u8; 4];

const LIQUID_ALPHA: u8 = 160;

/// Per-block colors for the three shading tiers, indexed by `Block::id()`.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockPalette {
    tiers: [[Rgba; 3]; Block::COUNT],
}

#[inline]
fn tier_index(role: FaceRole) -> usize {
    match role {
        FaceRole::Top => 0,
        FaceRole::Side => 1,
        FaceRole::Bottom => 2,
    }
}

impl Default for BlockPalette {
    fn default() -> Self {
        let mut tiers = [[[0, 0, 0, 0]; 3]; Block::COUNT];
        for b in Block::ALL {
            let (top, side, bottom, a) = match b {
                Block::Air => ([0, 0, 0], [0, 0, 0], [0, 0, 0], 0),
                Block::Grass => ([106, 170, 64], [134, 96, 67], [121, 85, 58], 255),
                Block::Dirt => ([134, 96, 67], [121, 85, 58], [104, 72, 48], 255),
                Block::Stone => ([128, 128, 128], [112, 112, 112], [96, 96, 96], 255),
                Block::Sand => ([219, 207, 163], [201, 189, 146], [184, 172, 131], 255),
                Block::Snow => ([249, 254, 254], [226, 232, 236], [205, 212, 218], 255),
                Block::Gravel => ([136, 126, 126], [120, 111, 111], [103, 95, 95], 255),
                Block::Wood => ([160, 130, 80], [102, 81, 51], [160, 130, 80], 255),
                Block::Leaves => ([60, 140, 40], [52, 122, 35], [44, 104, 30], 255),
                Block::Water => ([48, 96, 200], [40, 82, 176], [34, 70, 150], LIQUID_ALPHA),
            };
            let rgba = |c: [u8; 3]| [c[0], c[1], c[2], a];
            tiers[b.id() as usize] = [rgba(top), rgba(side), rgba(bottom)];
        }
        Self { tiers }
    }
}

impl BlockPalette {
    #[inline]
    pub fn color(&self, block: Block, role: FaceRole) -> Rgba {
        self.tiers[block.id() as usize][tier_index(role)]
    }

    pub fn set_color(&mut self, block: Block, role: FaceRole, rgba: Rgba) {
        self.tiers[block.id() as usize][tier_index(role)] = rgba;
    }

    /// Starts from the built-in colors and applies overrides from TOML.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: PaletteConfig = toml::from_str(toml_str)?;
        let mut palette = BlockPalette::default();
        // Sorted so a bad key always reports the same error.
        let mut entries: Vec<(String, ColorEntry)> = cfg.blocks.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, entry) in entries {
            let block =
                Block::from_name(&key).ok_or_else(|| format!("unknown block '{key}' in palette"))?;
            let default_alpha = palette.color(block, FaceRole::Side)[3];
            let (top, side, bottom, alpha) = match entry {
                ColorEntry::Uniform(c) => (c, c, c, None),
                ColorEntry::Tiered {
                    top,
                    side,
                    bottom,
                    alpha,
                } => (top, side, bottom.unwrap_or(side), alpha),
            };
            let a = alpha.unwrap_or(default_alpha);
            palette.set_color(block, FaceRole::Top, [top[0], top[1], top[2], a]);
            palette.set_color(block, FaceRole::Side, [side[0], side[1], side[2], a]);
            palette.set_color(block, FaceRole::Bottom, [bottom[0], bottom[1], bottom[2], a]);
        }
        Ok(palette)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }
}

// --- Config ---

#[derive(Deserialize)]
pub struct PaletteConfig {
    #[serde(default)]
    pub blocks: HashMap<String, ColorEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub enum ColorEntry {
    // Simple: stone = [128, 128, 128]
    Uniform([u8; 3]),
    // Detailed: grass = { top = [..], side = [..], bottom = [..], alpha = 255 }
    Tiered {
        top: [u8; 3],
        side: [u8; 3],
        bottom: Option<[u8; 3]>,
        alpha: Option<u8>,
    },
}
