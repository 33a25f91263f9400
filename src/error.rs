use std::path::PathBuf;

use thiserror::Error;

/// Structural hazards that stop an instruction from issuing this cycle.
///
/// Expected backpressure: the caller re-presents the same instruction next cycle.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueError {
    #[error("all reservation stations are occupied")]
    ReservationStationsFull,

    #[error("the reorder buffer is full")]
    ReorderBufferFull,
}

/// Top-level error type for the simulator
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Failed to read trace '{0}': {1}")]
    TraceRead(PathBuf, #[source] std::io::Error),

    #[error("Trace line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Execution limit reached: {0} cycles without draining the pipeline")]
    CycleLimit(u64),
}

pub type SimResult<T> = Result<T, SimError>;
