use crate::pipe::PipeKind;

/// Logical time of every pipe, as known by one pipe.
///
/// Entry `p` is the stamp of the last operation of pipe `p` that happens before the owner's
/// next operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VectorClock {
    stamps: [u64; PipeKind::COUNT],
}

impl VectorClock {
    /// Stamp of the given pipe.
    pub fn get(&self, pipe: PipeKind) -> u64 {
        self.stamps[pipe.index()]
    }

    /// Advance the owner's own entry, returning the new stamp.
    pub fn tick(&mut self, pipe: PipeKind) -> u64 {
        let stamp = &mut self.stamps[pipe.index()];
        *stamp += 1;
        *stamp
    }

    /// Learn everything the other clock knows.
    pub fn join(&mut self, other: &VectorClock) {
        for (mine, theirs) in self.stamps.iter_mut().zip(other.stamps.iter()) {
            *mine = u64::max(*mine, *theirs);
        }
    }

    /// Whether the operation `stamp` of `pipe` happens before the owner's next operation.
    pub fn covers(&self, pipe: PipeKind, stamp: u64) -> bool {
        self.get(pipe) >= stamp
    }
}
