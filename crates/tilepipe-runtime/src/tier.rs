use core::fmt::Display;

use crate::{memory::TierArena, pipe::PipeKind};
use alloc::{vec, vec::Vec};
use tilepipe_common::Element;

/// On-chip memory tier.
///
/// Each tier has a fixed capacity and can only be written and read by specific pipes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum TierKind {
    /// Large staging buffer between global memory and the matrix operand tiers.
    Staging,
    /// Left operand of the matrix unit.
    Left,
    /// Right operand of the matrix unit.
    Right,
    /// Output of the matrix unit.
    Accumulator,
    /// Working memory of the vector unit.
    Vector,
}

impl TierKind {
    /// Every tier, in index order.
    pub const ALL: [TierKind; 5] = [
        TierKind::Staging,
        TierKind::Left,
        TierKind::Right,
        TierKind::Accumulator,
        TierKind::Vector,
    ];

    /// Number of tiers.
    pub const COUNT: usize = Self::ALL.len();

    /// Position of the tier in [TierKind::ALL].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Pipes allowed to write to the tier.
    pub const fn writers(self) -> &'static [PipeKind] {
        match self {
            TierKind::Staging => &[PipeKind::Load, PipeKind::Fixup],
            TierKind::Left | TierKind::Right => &[PipeKind::Move],
            TierKind::Accumulator => &[PipeKind::Matrix],
            TierKind::Vector => &[PipeKind::Load, PipeKind::Vector, PipeKind::Fixup],
        }
    }

    /// Pipes allowed to read from the tier.
    pub const fn readers(self) -> &'static [PipeKind] {
        match self {
            TierKind::Staging => &[PipeKind::Move],
            TierKind::Left | TierKind::Right => &[PipeKind::Matrix],
            TierKind::Accumulator => &[PipeKind::Matrix, PipeKind::Fixup],
            TierKind::Vector => &[PipeKind::Vector, PipeKind::Store],
        }
    }

    /// Whether the pipe may write to the tier.
    pub fn writable_by(self, pipe: PipeKind) -> bool {
        self.writers().contains(&pipe)
    }

    /// Whether the pipe may read from the tier.
    pub fn readable_by(self, pipe: PipeKind) -> bool {
        self.readers().contains(&pipe)
    }
}

impl Display for TierKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            TierKind::Staging => "staging",
            TierKind::Left => "left",
            TierKind::Right => "right",
            TierKind::Accumulator => "accumulator",
            TierKind::Vector => "vector",
        };
        f.write_str(name)
    }
}

/// Static properties of a tier on a given target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, new, serde::Serialize, serde::Deserialize)]
pub struct TierProperties {
    /// Which tier.
    pub kind: TierKind,
    /// Capacity in bytes.
    pub capacity: usize,
    /// Alignment in bytes of every placement.
    pub alignment: usize,
}

/// A tier of one core: its bytes and the placements made in it.
///
/// The contents outlive kernels, the placements don't.
#[derive(Debug)]
pub struct MemoryTier {
    properties: TierProperties,
    bytes: Vec<u8>,
    arena: TierArena,
}

impl MemoryTier {
    /// Create a zeroed tier.
    pub fn new(properties: TierProperties) -> Self {
        Self {
            properties,
            bytes: vec![0; properties.capacity],
            arena: TierArena::new(properties),
        }
    }

    /// Which tier.
    pub fn kind(&self) -> TierKind {
        self.properties.kind
    }

    /// Static properties.
    pub fn properties(&self) -> &TierProperties {
        &self.properties
    }

    /// Capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.properties.capacity
    }

    /// Raw bytes of the tier.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable raw bytes of the tier.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Read the element at the given byte offset.
    ///
    /// # Panics
    /// Panics when the element isn't inside the tier. Operators check their regions when issued.
    pub fn read<E: Element>(&self, offset: usize) -> E {
        bytemuck::pod_read_unaligned(&self.bytes[offset..offset + size_of::<E>()])
    }

    /// Write the element at the given byte offset.
    ///
    /// # Panics
    /// Panics when the element isn't inside the tier. Operators check their regions when issued.
    pub fn write<E: Element>(&mut self, offset: usize, value: E) {
        self.bytes[offset..offset + size_of::<E>()].copy_from_slice(bytemuck::bytes_of(&value));
    }

    /// Placements made in the tier.
    pub fn arena(&self) -> &TierArena {
        &self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut TierArena {
        &mut self.arena
    }
}
