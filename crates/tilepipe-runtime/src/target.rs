use alloc::string::String;

use crate::tier::{TierKind, TierProperties};

/// Alignment in bytes of every tier placement.
pub const TIER_ALIGNMENT: usize = 32;

const KIB: usize = 1024;

/// Capabilities of an accelerator generation.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TargetProperties {
    /// Name of the generation.
    pub name: String,
    /// Tiers of every core, in [TierKind::ALL] order.
    pub tiers: [TierProperties; TierKind::COUNT],
    /// Number of hardware events per pair of pipes.
    pub events_per_pair: u8,
    /// Number of cores.
    pub num_cores: usize,
}

impl TargetProperties {
    /// Properties of a tier.
    pub fn tier(&self, kind: TierKind) -> &TierProperties {
        &self.tiers[kind.index()]
    }

    fn with_capacities(
        name: &str,
        capacities: [usize; TierKind::COUNT],
        events_per_pair: u8,
        num_cores: usize,
    ) -> Self {
        let tiers = core::array::from_fn(|i| {
            TierProperties::new(TierKind::ALL[i], capacities[i], TIER_ALIGNMENT)
        });

        Self {
            name: name.into(),
            tiers,
            events_per_pair,
            num_cores,
        }
    }
}

/// An accelerator generation kernels can be written against.
pub trait Target {
    /// Capabilities of the generation.
    fn properties() -> TargetProperties;
}

/// Training oriented generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrainingTarget;

impl Target for TrainingTarget {
    fn properties() -> TargetProperties {
        TargetProperties::with_capacities(
            "training",
            [512 * KIB, 64 * KIB, 64 * KIB, 128 * KIB, 192 * KIB],
            8,
            24,
        )
    }
}

/// Inference oriented generation, with larger accumulator and vector tiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceTarget;

impl Target for InferenceTarget {
    fn properties() -> TargetProperties {
        TargetProperties::with_capacities(
            "inference",
            [512 * KIB, 64 * KIB, 64 * KIB, 256 * KIB, 248 * KIB],
            16,
            32,
        )
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "target-inference")] {
        /// Target selected at build time.
        pub type DefaultTarget = InferenceTarget;
    } else {
        /// Target selected at build time.
        pub type DefaultTarget = TrainingTarget;
    }
}
