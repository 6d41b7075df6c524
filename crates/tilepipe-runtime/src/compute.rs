use alloc::{collections::VecDeque, sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicUsize, Ordering};
use tilepipe_common::backtrace::BackTrace;

use crate::{
    ExecutionError, FenceError, MemoryError,
    config::{GlobalConfig, validation::ValidationLevel},
    fence::{EventId, EventPool, FenceKey, FenceToken, FlagTable},
    logging::{PipeStats, PipelineLogger},
    memory::{GlobalMemory, MemoryView, Reservation},
    pipe::{AccessMode, Instruction, PipeKind, PipeOp, Resource},
    scheduler::Scheduler,
    target::TargetProperties,
    tier::{MemoryTier, TierKind},
    validation::HazardTracker,
};

/// One accelerator core: its tiers, its pipe queues and its fence state.
#[derive(Debug)]
pub struct Core {
    index: usize,
    tiers: Vec<MemoryTier>,
    queues: [VecDeque<Instruction>; PipeKind::COUNT],
    flags: FlagTable,
    pool: EventPool,
    leaks: Arc<AtomicUsize>,
    hazards: HazardTracker,
    stats: PipeStats,
    scheduler: Scheduler,
    validation: ValidationLevel,
    logger: Arc<PipelineLogger>,
}

impl Core {
    pub(crate) fn new(
        index: usize,
        properties: &TargetProperties,
        config: &GlobalConfig,
        logger: Arc<PipelineLogger>,
    ) -> Self {
        Self {
            index,
            tiers: properties.tiers.iter().copied().map(MemoryTier::new).collect(),
            queues: Default::default(),
            flags: FlagTable::default(),
            pool: EventPool::new(properties.events_per_pair),
            leaks: Arc::new(AtomicUsize::new(0)),
            hazards: HazardTracker::default(),
            stats: PipeStats::default(),
            scheduler: Scheduler::new(config.pipeline.schedule),
            validation: config.validation.level,
            logger,
        }
    }

    /// Index of the core on its device.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Checks performed by this core.
    pub fn validation(&self) -> ValidationLevel {
        self.validation
    }

    /// A tier of the core.
    pub fn tier(&self, kind: TierKind) -> &MemoryTier {
        &self.tiers[kind.index()]
    }

    /// Counters of the running kernel.
    pub fn stats(&self) -> &PipeStats {
        &self.stats
    }

    /// Whether every pipe queue is empty.
    pub fn is_idle(&self) -> bool {
        self.queues.iter().all(VecDeque::is_empty)
    }

    /// Reserve an aligned region of a tier.
    pub fn reserve(&mut self, tier: TierKind, size: usize) -> Result<Reservation, MemoryError> {
        self.tiers[tier.index()].arena_mut().reserve(size)
    }

    /// Reserve a region of a tier at a fixed offset.
    ///
    /// Overlap with a live reservation is only detected under [ValidationLevel::Full].
    pub fn reserve_at(
        &mut self,
        tier: TierKind,
        offset: usize,
        size: usize,
    ) -> Result<Reservation, MemoryError> {
        let check_overlap = self.validation.checks_hazards();
        self.tiers[tier.index()]
            .arena_mut()
            .reserve_at(offset, size, check_overlap)
    }

    /// Append an operation to a pipe queue.
    ///
    /// Fails when the pipe can't access a declared tier, or a declared range falls outside of
    /// its tier or buffer.
    pub fn issue(
        &mut self,
        pipe: PipeKind,
        op: PipeOp,
        global: &GlobalMemory,
    ) -> Result<(), MemoryError> {
        for access in op.accesses() {
            match access.resource {
                Resource::Tier(tier) => {
                    let allowed = match access.mode {
                        AccessMode::Read => tier.readable_by(pipe),
                        AccessMode::Write => tier.writable_by(pipe),
                    };
                    if !allowed {
                        return Err(MemoryError::Affinity {
                            tier,
                            pipe,
                            mode: access.mode,
                        });
                    }

                    let capacity = self.tiers[tier.index()].capacity();
                    if access.range.end > capacity {
                        return Err(MemoryError::CapacityExceeded {
                            tier,
                            offset: access.range.start,
                            size: access.range.len(),
                            capacity,
                        });
                    }
                }
                Resource::Global(id) => {
                    let len = global.get(id)?.len();
                    if access.range.end > len {
                        return Err(MemoryError::OutOfRange {
                            id,
                            start: access.range.start,
                            end: access.range.end,
                            len,
                        });
                    }
                }
            }
        }

        self.push(pipe, Instruction::Op(op));
        Ok(())
    }

    /// Signal a fence from `src` to `dst` on an event taken from the pair's pool.
    pub fn signal(&mut self, src: PipeKind, dst: PipeKind) -> Result<FenceToken, FenceError> {
        check_pair(src, dst)?;
        let key = self.pool.acquire(src, dst)?;
        self.push(src, Instruction::Signal(key));

        Ok(FenceToken::new(key, self.leaks.clone()))
    }

    /// Make the destination pipe of the token wait for its signal.
    ///
    /// The event goes back to the pool right away. A later signal on it holds its pipe until
    /// this wait has executed.
    pub fn wait(&mut self, token: FenceToken) {
        let key = token.disarm();
        self.pool.release(key);
        self.flags.queue_wait(key);
        self.push(key.dst, Instruction::Wait(key));
    }

    /// Signal a hand-numbered fence.
    pub fn set_flag(
        &mut self,
        src: PipeKind,
        dst: PipeKind,
        event: EventId,
    ) -> Result<(), FenceError> {
        let key = self.manual_key(src, dst, event)?;
        self.push(src, Instruction::Signal(key));
        Ok(())
    }

    /// Wait on a hand-numbered fence.
    pub fn wait_flag(
        &mut self,
        src: PipeKind,
        dst: PipeKind,
        event: EventId,
    ) -> Result<(), FenceError> {
        let key = self.manual_key(src, dst, event)?;
        self.push(dst, Instruction::Wait(key));
        Ok(())
    }

    /// Execute every queued instruction.
    ///
    /// Pipes are interleaved by the configured scheduling policy. Each pipe executes in issue
    /// order and a wait blocks its pipe until the fence is signaled.
    pub fn synchronize(&mut self, global: &mut GlobalMemory) -> Result<(), ExecutionError> {
        loop {
            let pending: Vec<PipeKind> = PipeKind::ALL
                .into_iter()
                .filter(|pipe| !self.queues[pipe.index()].is_empty())
                .collect();

            if pending.is_empty() {
                return Ok(());
            }

            let single_step = self.scheduler.single_step();
            let mut progressed = false;

            for pipe in self.scheduler.next_round(&pending) {
                if self.step(pipe, global)? {
                    progressed = true;
                    if single_step {
                        break;
                    }
                } else {
                    self.stats.get_mut(pipe).stalls += 1;
                }
            }

            if !progressed {
                let blocked = pending
                    .iter()
                    .filter_map(|pipe| match self.queues[pipe.index()].front() {
                        Some(Instruction::Wait(key)) => Some(*key),
                        _ => None,
                    })
                    .collect();

                return Err(ExecutionError::Deadlock {
                    blocked,
                    backtrace: BackTrace::capture(),
                });
            }
        }
    }

    /// Execute the next instruction of the pipe, returning false when it is blocked.
    fn step(&mut self, pipe: PipeKind, global: &mut GlobalMemory) -> Result<bool, ExecutionError> {
        let queue = &mut self.queues[pipe.index()];

        match queue.front() {
            None => return Ok(false),
            Some(Instruction::Wait(key)) if !self.flags.try_wait(key) => return Ok(false),
            Some(Instruction::Signal(key)) if self.flags.must_hold(key) => return Ok(false),
            _ => {}
        }

        let Some(instruction) = queue.pop_front() else {
            return Ok(false);
        };
        self.logger
            .log_execute(self.index, format_args!("{pipe:>6} {instruction}"));

        match instruction {
            Instruction::Wait(key) => {
                if self.validation.checks_hazards() {
                    self.hazards.on_wait(key);
                }
                self.stats.get_mut(pipe).waits += 1;
            }
            Instruction::Signal(key) => {
                if !self.flags.signal(key) {
                    if self.validation.checks_fences() {
                        return Err(FenceError::AlreadySignaled { key }.into());
                    }
                    log::warn!("Fence {key} signaled while already set, a signal is lost");
                }
                if self.validation.checks_hazards() {
                    self.hazards.on_signal(key);
                }
                self.stats.get_mut(pipe).signals += 1;
            }
            Instruction::Op(op) => {
                if self.validation.checks_hazards() {
                    self.hazards.on_op(pipe, &op)?;
                }
                let mut view = MemoryView::new(&mut self.tiers, global);
                op.execute(&mut view)?;
                self.stats.get_mut(pipe).ops += 1;
            }
        }

        Ok(true)
    }

    /// Prepare the core for a new kernel block.
    ///
    /// Placements are released, tier contents are kept.
    pub(crate) fn begin_kernel(&mut self) {
        for tier in self.tiers.iter_mut() {
            tier.arena_mut().reset();
        }
        self.queues.iter_mut().for_each(VecDeque::clear);
        self.flags.clear();
        self.pool.reset();
        self.hazards.reset();
        self.leaks.store(0, Ordering::Relaxed);
        self.stats = PipeStats::default();
    }

    /// Drain the pipes and check the fence protocol at the end of a kernel block.
    pub(crate) fn finish_kernel(
        &mut self,
        global: &mut GlobalMemory,
    ) -> Result<PipeStats, ExecutionError> {
        self.synchronize(global)?;

        if self.validation.checks_fences() {
            let leaked = self.leaks.swap(0, Ordering::Relaxed);
            if leaked > 0 {
                return Err(FenceError::TokenLeaked { count: leaked }.into());
            }

            let keys = self.flags.pending();
            if !keys.is_empty() {
                return Err(FenceError::Unmatched { keys }.into());
            }
        }

        Ok(core::mem::take(&mut self.stats))
    }

    /// Drop every queued instruction after a failure.
    pub(crate) fn abort(&mut self) {
        self.queues.iter_mut().for_each(VecDeque::clear);
        self.flags.clear();
        self.pool.reset();
    }

    fn push(&mut self, pipe: PipeKind, instruction: Instruction) {
        self.logger
            .log_issue(self.index, format_args!("{pipe:>6} {instruction}"));
        self.queues[pipe.index()].push_back(instruction);
    }

    fn manual_key(
        &self,
        src: PipeKind,
        dst: PipeKind,
        event: EventId,
    ) -> Result<FenceKey, FenceError> {
        check_pair(src, dst)?;
        self.pool.check_event(event)?;

        let key = FenceKey::new(src, dst, event);
        if self.pool.is_held(&key) {
            return Err(FenceError::EventInUse { key });
        }
        Ok(key)
    }
}

fn check_pair(src: PipeKind, dst: PipeKind) -> Result<(), FenceError> {
    if src == dst {
        return Err(FenceError::SamePipe { pipe: src });
    }
    Ok(())
}
