use alloc::{borrow::Cow, boxed::Box, vec::Vec};
use core::{fmt::Display, ops::Range};

use crate::{
    ExecutionError,
    fence::FenceKey,
    memory::{BufferId, MemoryView},
    tier::TierKind,
};

/// Independent execution unit of a core.
///
/// Each pipe executes its own instructions in issue order. Ordering between pipes only exists
/// through fences.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum PipeKind {
    /// Global memory to the staging or vector tier.
    Load,
    /// Vector tier to global memory.
    Store,
    /// Staging tier to the matrix operand tiers.
    Move,
    /// Vector unit.
    Vector,
    /// Matrix unit.
    Matrix,
    /// Accumulator tier to global memory, staging or the vector tier, with conversion.
    Fixup,
}

impl PipeKind {
    /// Every pipe, in index order.
    pub const ALL: [PipeKind; 6] = [
        PipeKind::Load,
        PipeKind::Store,
        PipeKind::Move,
        PipeKind::Vector,
        PipeKind::Matrix,
        PipeKind::Fixup,
    ];

    /// Number of pipes.
    pub const COUNT: usize = Self::ALL.len();

    /// Position of the pipe in [PipeKind::ALL].
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl Display for PipeKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            PipeKind::Load => "load",
            PipeKind::Store => "store",
            PipeKind::Move => "move",
            PipeKind::Vector => "vector",
            PipeKind::Matrix => "matrix",
            PipeKind::Fixup => "fixup",
        };
        f.write_str(name)
    }
}

/// Memory an operation touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    /// A tier of the executing core.
    Tier(TierKind),
    /// A device buffer.
    Global(BufferId),
}

impl Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Resource::Tier(tier) => write!(f, "the {tier} tier"),
            Resource::Global(id) => write!(f, "global {id}"),
        }
    }
}

/// Direction of a memory access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// The bytes are read.
    Read,
    /// The bytes are written.
    Write,
}

impl Display for AccessMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AccessMode::Read => f.write_str("read"),
            AccessMode::Write => f.write_str("write"),
        }
    }
}

/// A byte range an operation reads or writes.
#[derive(Clone, Debug, PartialEq, Eq, new)]
pub struct Access {
    /// Memory touched.
    pub resource: Resource,
    /// Byte range touched.
    pub range: Range<usize>,
    /// Read or write.
    pub mode: AccessMode,
}

impl Access {
    /// Whether the two accesses can race: same bytes and at least one write.
    pub fn conflicts(&self, other: &Access) -> bool {
        self.resource == other.resource
            && self.range.start < other.range.end
            && other.range.start < self.range.end
            && (self.mode == AccessMode::Write || other.mode == AccessMode::Write)
    }
}

type ExecuteFn = Box<dyn for<'a> FnOnce(&mut MemoryView<'a>) -> Result<(), ExecutionError>>;

/// An operation issued to a pipe.
///
/// It declares the memory it touches so the validator can check it, and carries the body run
/// when the pipe reaches it.
pub struct PipeOp {
    name: Cow<'static, str>,
    accesses: Vec<Access>,
    execute: ExecuteFn,
}

impl PipeOp {
    /// Create an operation with the given body.
    pub fn new<F>(name: impl Into<Cow<'static, str>>, execute: F) -> Self
    where
        F: FnOnce(&mut MemoryView<'_>) -> Result<(), ExecutionError> + 'static,
    {
        Self {
            name: name.into(),
            accesses: Vec::new(),
            execute: Box::new(execute),
        }
    }

    /// Declare a read.
    pub fn reads(mut self, resource: Resource, range: Range<usize>) -> Self {
        self.accesses
            .push(Access::new(resource, range, AccessMode::Read));
        self
    }

    /// Declare a write.
    pub fn writes(mut self, resource: Resource, range: Range<usize>) -> Self {
        self.accesses
            .push(Access::new(resource, range, AccessMode::Write));
        self
    }

    /// Name of the operation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared accesses.
    pub fn accesses(&self) -> &[Access] {
        &self.accesses
    }

    pub(crate) fn execute(self, memory: &mut MemoryView<'_>) -> Result<(), ExecutionError> {
        (self.execute)(memory)
    }
}

impl core::fmt::Debug for PipeOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PipeOp")
            .field("name", &self.name)
            .field("accesses", &self.accesses)
            .finish()
    }
}

/// An entry of a pipe queue.
#[derive(Debug)]
pub(crate) enum Instruction {
    Op(PipeOp),
    Signal(FenceKey),
    Wait(FenceKey),
}

impl Display for Instruction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Instruction::Op(op) => write!(f, "op {}", op.name()),
            Instruction::Signal(key) => write!(f, "signal {key}"),
            Instruction::Wait(key) => write!(f, "wait {key}"),
        }
    }
}
