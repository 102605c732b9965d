use std::error::Error;
use std::fmt;

use strata_chunk::ContractViolation;
use strata_runtime::RuntimeError;

#[derive(Debug)]
pub enum StreamError {
    /// Malformed data from a generator or mesh job. The engine must stop.
    Contract(ContractViolation),
    WorkersGone,
    Runtime(RuntimeError),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Contract(v) => write!(f, "contract violation: {v}"),
            StreamError::WorkersGone => write!(f, "worker pool disconnected"),
            StreamError::Runtime(e) => write!(f, "{e}"),
        }
    }
}

impl Error for StreamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StreamError::Contract(v) => Some(v),
            StreamError::Runtime(e) => Some(e),
            StreamError::WorkersGone => None,
        }
    }
}

impl From<ContractViolation> for StreamError {
    fn from(v: ContractViolation) -> Self {
        StreamError::Contract(v)
    }
}

impl From<RuntimeError> for StreamError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::WorkersGone => StreamError::WorkersGone,
            other => StreamError::Runtime(other),
        }
    }
}
