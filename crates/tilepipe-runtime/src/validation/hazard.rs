use alloc::{string::ToString, vec::Vec};
use hashbrown::HashMap;

use crate::{
    HazardError,
    error::AccessSite,
    fence::FenceKey,
    pipe::{Access, AccessMode, PipeKind, PipeOp},
};

use super::VectorClock;

/// Number of operations between two pruning passes.
const PRUNE_PERIOD: usize = 256;

#[derive(Debug)]
struct AccessRecord {
    pipe: PipeKind,
    stamp: u64,
    op: alloc::string::String,
    access: Access,
}

/// Happens-before race detector.
///
/// Each pipe owns a vector clock. A signal publishes the clock of its source pipe, the matching
/// wait merges it into the destination pipe. Two conflicting accesses from different pipes are a
/// race unless the clock of the later one covers the earlier one.
#[derive(Debug, Default)]
pub(crate) struct HazardTracker {
    clocks: [VectorClock; PipeKind::COUNT],
    published: HashMap<FenceKey, VectorClock>,
    records: Vec<AccessRecord>,
    since_prune: usize,
}

impl HazardTracker {
    pub(crate) fn on_signal(&mut self, key: FenceKey) {
        self.published.insert(key, self.clocks[key.src.index()]);
    }

    pub(crate) fn on_wait(&mut self, key: FenceKey) {
        if let Some(clock) = self.published.remove(&key) {
            self.clocks[key.dst.index()].join(&clock);
        }
    }

    pub(crate) fn on_op(&mut self, pipe: PipeKind, op: &PipeOp) -> Result<(), HazardError> {
        let clock = &self.clocks[pipe.index()];

        for access in op.accesses() {
            let conflict = self.records.iter().find(|record| {
                record.pipe != pipe
                    && record.access.conflicts(access)
                    && !clock.covers(record.pipe, record.stamp)
            });

            if let Some(record) = conflict {
                return Err(HazardError::Race {
                    resource: access.resource,
                    first: AccessSite {
                        pipe: record.pipe,
                        op: record.op.clone(),
                        range: record.access.range.clone(),
                        mode: record.access.mode,
                    },
                    second: AccessSite {
                        pipe,
                        op: op.name().to_string(),
                        range: access.range.clone(),
                        mode: access.mode,
                    },
                });
            }
        }

        let stamp = self.clocks[pipe.index()].tick(pipe);
        for access in op.accesses() {
            self.records
                .retain(|record| record.pipe != pipe || !supersedes(access, &record.access));
            self.records.push(AccessRecord {
                pipe,
                stamp,
                op: op.name().to_string(),
                access: access.clone(),
            });
        }

        self.since_prune += 1;
        if self.since_prune >= PRUNE_PERIOD {
            self.prune();
        }

        Ok(())
    }

    /// Number of accesses still tracked.
    #[cfg(test)]
    pub(crate) fn num_records(&self) -> usize {
        self.records.len()
    }

    /// Forget accesses every pipe is already ordered after, they can't race anymore.
    pub(crate) fn prune(&mut self) {
        let clocks = &self.clocks;
        self.records.retain(|record| {
            !clocks
                .iter()
                .all(|clock| clock.covers(record.pipe, record.stamp))
        });
        self.since_prune = 0;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Whether any race with `old` would also be a race with `new`, when both come from the same pipe
/// and `new` is later.
fn supersedes(new: &Access, old: &Access) -> bool {
    new.resource == old.resource
        && new.range.start <= old.range.start
        && old.range.end <= new.range.end
        && (new.mode == AccessMode::Write || old.mode == AccessMode::Read)
}
