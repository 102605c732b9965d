use std::error::Error;
use std::fmt;

use strata_world::ChunkCoord;

/// Data-layout bugs. Never recovered from at runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractViolation {
    CellCount {
        coord: ChunkCoord,
        expected: usize,
        got: usize,
    },
    BoundarySize {
        expected: usize,
        got: usize,
    },
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractViolation::CellCount {
                coord,
                expected,
                got,
            } => write!(
                f,
                "chunk ({}, {}, {}) has {got} cells, expected {expected}",
                coord.cx, coord.cy, coord.cz
            ),
            ContractViolation::BoundarySize { expected, got } => {
                write!(f, "boundary slice has {got} cells, expected {expected}")
            }
        }
    }
}

impl Error for ContractViolation {}
