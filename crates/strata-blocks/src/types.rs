use serde::{Deserialize, Serialize};

/// A single cell value. `Air` is the empty type and the out-of-bounds sentinel.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Block {
    #[default]
    Air = 0,
    Grass = 1,
    Dirt = 2,
    Stone = 3,
    Sand = 4,
    Snow = 5,
    Gravel = 6,
    Wood = 7,
    Leaves = 8,
    Water = 9,
}

/// How the mesher and collision builder treat a block.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlockClass {
    Empty,
    Solid,
    Liquid,
}

/// Shading tier a face direction belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FaceRole {
    Top,
    Bottom,
    Side,
}

impl Block {
    pub const COUNT: usize = 10;

    pub const ALL: [Block; Block::COUNT] = [
        Block::Air,
        Block::Grass,
        Block::Dirt,
        Block::Stone,
        Block::Sand,
        Block::Snow,
        Block::Gravel,
        Block::Wood,
        Block::Leaves,
        Block::Water,
    ];

    #[inline]
    pub const fn id(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn from_id(id: u8) -> Option<Block> {
        Block::ALL.get(id as usize).copied()
    }

    pub fn from_name(name: &str) -> Option<Block> {
        Block::ALL.iter().copied().find(|b| b.name() == name)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Block::Air => "air",
            Block::Grass => "grass",
            Block::Dirt => "dirt",
            Block::Stone => "stone",
            Block::Sand => "sand",
            Block::Snow => "snow",
            Block::Gravel => "gravel",
            Block::Wood => "wood",
            Block::Leaves => "leaves",
            Block::Water => "water",
        }
    }

    #[inline]
    pub const fn class(self) -> BlockClass {
        match self {
            Block::Air => BlockClass::Empty,
            Block::Water => BlockClass::Liquid,
            _ => BlockClass::Solid,
        }
    }

    #[inline]
    pub const fn is_air(self) -> bool {
        matches!(self, Block::Air)
    }

    #[inline]
    pub const fn is_solid(self) -> bool {
        matches!(self.class(), BlockClass::Solid)
    }

    #[inline]
    pub const fn is_liquid(self) -> bool {
        matches!(self.class(), BlockClass::Liquid)
    }
}
