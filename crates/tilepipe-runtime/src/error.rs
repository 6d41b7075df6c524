use alloc::{string::String, vec::Vec};
use thiserror::Error;
use tilepipe_common::backtrace::BackTrace;

use crate::{
    fence::{EventId, FenceKey},
    memory::BufferId,
    pipe::{AccessMode, PipeKind, Resource},
    tier::TierKind,
};

/// Errors related to tier placement and global memory.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The region doesn't fit in the tier.
    #[error(
        "Placement of {size} bytes at offset {offset} exceeds the {capacity} bytes of the {tier} tier"
    )]
    CapacityExceeded {
        /// The tier.
        tier: TierKind,
        /// Requested offset.
        offset: usize,
        /// Requested size.
        size: usize,
        /// Capacity of the tier.
        capacity: usize,
    },

    /// The region overlaps a live placement.
    #[error(
        "Placement [{offset}, {}) overlaps the live placement [{other_offset}, {}) of the {tier} tier",
        offset + size,
        other_offset + other_size
    )]
    Overlap {
        /// The tier.
        tier: TierKind,
        /// Requested offset.
        offset: usize,
        /// Requested size.
        size: usize,
        /// Offset of the existing placement.
        other_offset: usize,
        /// Size of the existing placement.
        other_size: usize,
    },

    /// The offset isn't aligned.
    #[error("Offset {offset} in the {tier} tier isn't aligned to {alignment} bytes")]
    Misaligned {
        /// The tier.
        tier: TierKind,
        /// Requested offset.
        offset: usize,
        /// Required alignment.
        alignment: usize,
    },

    /// The pipe can't access the tier.
    #[error("The {pipe} pipe can't {mode} the {tier} tier")]
    Affinity {
        /// The tier.
        tier: TierKind,
        /// The pipe.
        pipe: PipeKind,
        /// The attempted access.
        mode: AccessMode,
    },

    /// The byte range falls outside of the buffer.
    #[error("Bytes [{start}, {end}) are outside of {id}, which holds {len} bytes")]
    OutOfRange {
        /// The buffer.
        id: BufferId,
        /// First byte.
        start: usize,
        /// One past the last byte.
        end: usize,
        /// Size of the buffer.
        len: usize,
    },

    /// The buffer doesn't exist, or was released.
    #[error("Unknown device buffer {id}")]
    UnknownBuffer {
        /// The buffer.
        id: BufferId,
    },
}

/// Errors related to the fence protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FenceError {
    /// The flag was still set when signaled again, the first signal is lost.
    #[error("Fence {key} was signaled while already set")]
    AlreadySignaled {
        /// The fence.
        key: FenceKey,
    },

    /// Flags still set when the kernel finished.
    #[error("Fences signaled but never waited on: {}", display_keys(keys))]
    Unmatched {
        /// The fences.
        keys: Vec<FenceKey>,
    },

    /// Dependency tokens dropped without being waited on.
    #[error("{count} fence token(s) were dropped without being waited on")]
    TokenLeaked {
        /// Number of dropped tokens.
        count: usize,
    },

    /// Every event of the pipe pair is held by an outstanding token.
    #[error("No free event between {src} and {dst}, all {size} are held by outstanding tokens")]
    PoolExhausted {
        /// Signaling pipe.
        src: PipeKind,
        /// Waiting pipe.
        dst: PipeKind,
        /// Number of events per pair.
        size: u8,
    },

    /// A hand-numbered flag used an event held by an outstanding token.
    #[error("Event of fence {key} is held by an outstanding token")]
    EventInUse {
        /// The fence.
        key: FenceKey,
    },

    /// The event number doesn't exist on the target.
    #[error("Event {event} is out of range, the target has {size} events per pipe pair")]
    EventOutOfRange {
        /// The event.
        event: EventId,
        /// Number of events per pair.
        size: u8,
    },

    /// A pipe can't fence with itself, its instructions are already ordered.
    #[error("The {pipe} pipe can't fence with itself")]
    SamePipe {
        /// The pipe.
        pipe: PipeKind,
    },
}

/// An access conflicting with an earlier one without a fence ordering them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessSite {
    /// Pipe performing the access.
    pub pipe: PipeKind,
    /// Name of the operation.
    pub op: String,
    /// Accessed byte range.
    pub range: core::ops::Range<usize>,
    /// Read or write.
    pub mode: AccessMode,
}

impl core::fmt::Display for AccessSite {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} {} of bytes [{}, {}) on the {} pipe",
            self.op, self.mode, self.range.start, self.range.end, self.pipe
        )
    }
}

/// Errors found by the happens-before race detector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HazardError {
    /// Two pipes accessed the same bytes, at least one writing, without a fence between them.
    #[error("Data race on {resource}: {first} is not ordered before {second}")]
    Race {
        /// Memory involved.
        resource: Resource,
        /// Earlier access.
        first: AccessSite,
        /// Later access.
        second: AccessSite,
    },
}

/// Errors raised while pipes execute their instructions.
#[derive(Error)]
pub enum ExecutionError {
    /// Pipes have pending instructions but all of them wait on fences never signaled.
    #[error(
        "Deadlock: every pipe with pending work is blocked\nBlocked on:\n  {}\nBacktrace:\n{backtrace}",
        display_keys(blocked)
    )]
    Deadlock {
        /// The fences blocking the pipes.
        blocked: Vec<FenceKey>,
        /// The captured backtrace.
        backtrace: BackTrace,
    },

    /// The fence protocol was violated.
    #[error("Fence protocol violation\nCaused by:\n  {0}")]
    Fence(#[from] FenceError),

    /// A data race was found.
    #[error("Hazard\nCaused by:\n  {0}")]
    Hazard(#[from] HazardError),

    /// A memory error happened.
    #[error("Memory error\nCaused by:\n  {0}")]
    Memory(#[from] MemoryError),

    /// An index computed at run time addresses outside of its tile.
    #[error(
        "Index {index} is out of bounds for {len} elements in {op}\nBacktrace:\n{backtrace}"
    )]
    IndexOutOfBounds {
        /// Operation reading the index.
        op: String,
        /// The index.
        index: i64,
        /// Number of addressable elements.
        len: usize,
        /// The captured backtrace.
        backtrace: BackTrace,
    },
}

impl core::fmt::Debug for ExecutionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{self}"))
    }
}

fn display_keys(keys: &[FenceKey]) -> String {
    use core::fmt::Write;

    let mut out = String::new();
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{key}");
    }
    out
}
