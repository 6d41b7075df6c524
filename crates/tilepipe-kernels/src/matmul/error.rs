use alloc::string::String;
use thiserror::Error;
use tilepipe_runtime::tier::TierKind;

use crate::matmul::MatmulIdent;

/// Errors that can occur during the setup phase of a matmul, before anything is launched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatmulSetupError {
    /// The target lacks a resource the tiling needs.
    #[error("Unable to launch matmul because a required resource is unavailable: {0}")]
    Unavailable(#[from] MatmulAvailabilityError),

    /// The tiling is rejected by a tile it describes.
    #[error("Unable to launch matmul because the config is invalid: {0}")]
    InvalidConfig(String),

    /// A tensor doesn't have the shape the problem gives it.
    #[error(
        "Unable to launch matmul because {ident} has shape {}x{}, expected {}x{}",
        actual.0,
        actual.1,
        expected.0,
        expected.1
    )]
    ShapeMismatch {
        /// The tensor.
        ident: MatmulIdent,
        /// Shape implied by the other tensors.
        expected: (usize, usize),
        /// Shape of the tensor.
        actual: (usize, usize),
    },
}

/// A resource required by the matmul is not available on the target.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatmulAvailabilityError {
    /// The buffers of a tier don't fit in it.
    #[error("The {tier} tier holds {capacity} bytes but the tiling needs {required}")]
    TierTooSmall {
        /// The tier.
        tier: TierKind,
        /// Bytes reserved by the tiling.
        required: usize,
        /// Capacity of the tier.
        capacity: usize,
    },

    /// Fewer events per pipe pair than fences in flight.
    #[error("The tiling keeps {required} fences in flight per pipe pair, the target has {available}")]
    EventsUnavailable {
        /// Fences in flight.
        required: u8,
        /// Events of the target.
        available: u8,
    },
}
