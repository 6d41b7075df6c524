use std::sync::Arc;

use tilepipe_core::TileError;
use tilepipe_runtime::{
    Device, ExecutionError, FenceError, KernelContext,
    config::{GlobalConfig, pipeline::SchedulePolicy, validation::ValidationLevel},
    pipe::PipeKind,
    target::{Target, TrainingTarget},
};

#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error(transparent)]
    Tile(#[from] TileError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Fence(#[from] FenceError),
}

pub fn test_device() -> Device {
    let mut config = GlobalConfig::default();
    config.validation.level = ValidationLevel::Full;
    config.pipeline.schedule = SchedulePolicy::Shuffled { seed: 42 };

    Device::with_config(TrainingTarget::properties(), Arc::new(config))
}

/// Order everything issued so far on `src` before what comes next on `dst`.
pub fn fence(ctx: &mut KernelContext<'_>, src: PipeKind, dst: PipeKind) -> Result<(), FenceError> {
    let token = ctx.signal(src, dst)?;
    ctx.wait(token);
    Ok(())
}
