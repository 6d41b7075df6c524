use crate::{
    memory::GlobalMemory,
    tier::{MemoryTier, TierKind},
};

/// Memory visible to an executing operation: the tiers of its core and global memory.
pub struct MemoryView<'a> {
    tiers: &'a mut [MemoryTier],
    global: &'a mut GlobalMemory,
}

impl<'a> MemoryView<'a> {
    pub(crate) fn new(tiers: &'a mut [MemoryTier], global: &'a mut GlobalMemory) -> Self {
        Self { tiers, global }
    }

    /// A tier of the executing core.
    pub fn tier(&self, kind: TierKind) -> &MemoryTier {
        &self.tiers[kind.index()]
    }

    /// A mutable tier of the executing core.
    pub fn tier_mut(&mut self, kind: TierKind) -> &mut MemoryTier {
        &mut self.tiers[kind.index()]
    }

    /// Device global memory.
    pub fn global(&self) -> &GlobalMemory {
        self.global
    }

    /// Mutable device global memory.
    pub fn global_mut(&mut self) -> &mut GlobalMemory {
        self.global
    }

    /// A tier and global memory, borrowed together.
    pub fn split_mut(&mut self, kind: TierKind) -> (&mut MemoryTier, &mut GlobalMemory) {
        (&mut self.tiers[kind.index()], self.global)
    }
}
