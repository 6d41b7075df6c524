use core::fmt::Display;

use thiserror::Error;
use tilepipe_runtime::pipe::PipeKind;

/// Where a buffer slot is in its load, compute and store cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SlotState {
    /// Free to be loaded once its previous readers are done.
    #[default]
    Idle,
    /// The producer pipe is filling the slot.
    Loading,
    /// Filled, the consumer pipe hasn't started yet.
    Ready,
    /// The consumer pipe is reading the slot.
    Consuming,
    /// The store pipe is draining the result of the slot.
    Storing,
}

impl SlotState {
    /// Whether `self -> next` is an edge of the cycle.
    pub fn can_transition(self, next: SlotState) -> bool {
        use SlotState::*;

        matches!(
            (self, next),
            (Idle, Loading)
                | (Loading, Ready)
                | (Ready, Consuming)
                | (Consuming, Storing)
                | (Consuming, Idle)
                | (Storing, Idle)
        )
    }
}

impl Display for SlotState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            SlotState::Idle => "idle",
            SlotState::Loading => "loading",
            SlotState::Ready => "ready",
            SlotState::Consuming => "consuming",
            SlotState::Storing => "storing",
        };
        f.write_str(name)
    }
}

/// Pipes working on the slots of a ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, new)]
pub struct SlotRoles {
    /// Fills the slots.
    pub producer: PipeKind,
    /// Reads what the producer wrote.
    pub consumer: PipeKind,
    /// Drains what the consumer wrote, if anything has to leave the core.
    pub store: Option<PipeKind>,
}

impl SlotRoles {
    /// Slots filled by `producer` and read by `consumer`, nothing stored.
    pub fn pair(producer: PipeKind, consumer: PipeKind) -> Self {
        Self::new(producer, consumer, None)
    }

    /// Slots filled by `producer`, computed by `consumer` and drained by `store`.
    pub fn with_store(producer: PipeKind, consumer: PipeKind, store: PipeKind) -> Self {
        Self::new(producer, consumer, Some(store))
    }
}

/// Misuse of buffer rings and tile partitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The transition isn't an edge of the slot cycle.
    #[error("Slot {slot} can't go from {from} to {to}")]
    InvalidTransition {
        /// The slot.
        slot: usize,
        /// Current state.
        from: SlotState,
        /// Requested state.
        to: SlotState,
    },

    /// The slot would move on while a fence of its current state was never waited on.
    #[error("Slot {slot} leaves {state} before the fence it signaled was waited on")]
    PendingFence {
        /// The slot.
        slot: usize,
        /// Current state.
        state: SlotState,
    },

    /// The slot doesn't exist.
    #[error("Slot {slot} is out of range, the ring has {len} slots")]
    UnknownSlot {
        /// The slot.
        slot: usize,
        /// Number of slots.
        len: usize,
    },

    /// A ring without slots.
    #[error("A buffer ring needs at least one slot")]
    EmptyRing,

    /// A partition with empty tiles.
    #[error("Can't partition {extent} elements into empty tiles")]
    EmptyTile {
        /// Elements to partition.
        extent: usize,
    },
}
