use thiserror::Error;
use tilepipe_core::TileError;
use tilepipe_runtime::{ExecutionError, FenceError, MemoryError};

use crate::{matmul::MatmulSetupError, pipeline::ScheduleError};

/// Everything that can stop a kernel launch.
#[derive(Error, Debug)]
pub enum KernelError {
    /// An operator rejected its operands.
    #[error("Tile error\nCaused by:\n  {0}")]
    Tile(#[from] TileError),

    /// The pipes failed while executing.
    #[error("Execution error\nCaused by:\n  {0}")]
    Execution(#[from] ExecutionError),

    /// A fence couldn't be signaled.
    #[error("Fence error\nCaused by:\n  {0}")]
    Fence(#[from] FenceError),

    /// A buffer slot was driven through an illegal transition.
    #[error("Schedule error\nCaused by:\n  {0}")]
    Schedule(#[from] ScheduleError),

    /// The matmul can't run with the requested problem and tiling.
    #[error("{0}")]
    Setup(#[from] MatmulSetupError),

    /// Device memory couldn't be accessed.
    #[error("Memory error\nCaused by:\n  {0}")]
    Memory(#[from] MemoryError),
}
