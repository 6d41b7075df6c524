use crate::{
    ExecutionError, FenceError, MemoryError,
    compute::Core,
    config::validation::ValidationLevel,
    fence::{EventId, FenceToken},
    memory::{GlobalMemory, Reservation},
    pipe::{PipeKind, PipeOp},
    target::TargetProperties,
    tier::{MemoryTier, TierKind},
};

/// What a kernel sees while it runs on a core for one block.
pub struct KernelContext<'a> {
    core: &'a mut Core,
    global: &'a mut GlobalMemory,
    properties: &'a TargetProperties,
    block_idx: usize,
    block_num: usize,
}

impl<'a> KernelContext<'a> {
    pub(crate) fn new(
        core: &'a mut Core,
        global: &'a mut GlobalMemory,
        properties: &'a TargetProperties,
        block_idx: usize,
        block_num: usize,
    ) -> Self {
        Self {
            core,
            global,
            properties,
            block_idx,
            block_num,
        }
    }

    /// Index of the running block.
    pub fn block_idx(&self) -> usize {
        self.block_idx
    }

    /// Number of blocks of the launch.
    pub fn block_num(&self) -> usize {
        self.block_num
    }

    /// Index of the core running the block.
    pub fn core_idx(&self) -> usize {
        self.core.index()
    }

    /// Capabilities of the target.
    pub fn properties(&self) -> &TargetProperties {
        self.properties
    }

    /// Checks performed while the kernel runs.
    pub fn validation(&self) -> ValidationLevel {
        self.core.validation()
    }

    /// Device global memory.
    pub fn global(&self) -> &GlobalMemory {
        self.global
    }

    /// A tier of the running core.
    pub fn tier(&self, kind: TierKind) -> &MemoryTier {
        self.core.tier(kind)
    }

    /// Reserve an aligned region of a tier.
    pub fn reserve(&mut self, tier: TierKind, size: usize) -> Result<Reservation, MemoryError> {
        self.core.reserve(tier, size)
    }

    /// Reserve a region of a tier at a fixed offset.
    pub fn reserve_at(
        &mut self,
        tier: TierKind,
        offset: usize,
        size: usize,
    ) -> Result<Reservation, MemoryError> {
        self.core.reserve_at(tier, offset, size)
    }

    /// Append an operation to a pipe queue.
    pub fn issue(&mut self, pipe: PipeKind, op: PipeOp) -> Result<(), MemoryError> {
        self.core.issue(pipe, op, self.global)
    }

    /// Signal a fence from `src` to `dst`, returning the token to wait on.
    pub fn signal(&mut self, src: PipeKind, dst: PipeKind) -> Result<FenceToken, FenceError> {
        self.core.signal(src, dst)
    }

    /// Make the destination pipe of the token wait for its signal.
    pub fn wait(&mut self, token: FenceToken) {
        self.core.wait(token)
    }

    /// Signal a hand-numbered fence.
    pub fn set_flag(
        &mut self,
        src: PipeKind,
        dst: PipeKind,
        event: EventId,
    ) -> Result<(), FenceError> {
        self.core.set_flag(src, dst, event)
    }

    /// Wait on a hand-numbered fence.
    pub fn wait_flag(
        &mut self,
        src: PipeKind,
        dst: PipeKind,
        event: EventId,
    ) -> Result<(), FenceError> {
        self.core.wait_flag(src, dst, event)
    }

    /// Execute every queued instruction of the core.
    pub fn synchronize(&mut self) -> Result<(), ExecutionError> {
        self.core.synchronize(self.global)
    }
}
