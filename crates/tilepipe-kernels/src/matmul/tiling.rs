use alloc::{format, string::ToString};

use serde::{Deserialize, Serialize};
use tilepipe_core::{Fractal, Tile, TileError, TileLayout};
use tilepipe_runtime::{target::TargetProperties, tier::TierKind};

use crate::matmul::{MatmulAvailabilityError, MatmulPrecision, MatmulSetupError};

/// Slots of each double buffered ring.
pub(crate) const STAGES: usize = 2;

/// How a matmul problem is cut into tiles.
///
/// Every block computes `base_m x base_n` output tiles. For each of them the contraction runs
/// over slabs of `base_k * step_k` columns loaded into the staging tier, each slab feeding
/// `step_k` products of `base_m x base_k` by `base_k x base_n` operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TilingScheme {
    /// Rows of an output tile.
    pub base_m: usize,
    /// Columns of an output tile.
    pub base_n: usize,
    /// Contraction size of one matrix product.
    pub base_k: usize,
    /// Matrix products per staging slab.
    pub step_k: usize,
}

impl TilingScheme {
    /// Start describing a tiling scheme.
    pub fn builder() -> TilingSchemeBuilder {
        TilingSchemeBuilder::default()
    }

    /// Contraction size of one staging slab.
    pub fn slab_k(&self) -> usize {
        self.base_k * self.step_k
    }

    /// Bytes the scheme reserves in a tier.
    pub fn tier_usage<P: MatmulPrecision>(&self, tier: TierKind) -> Result<usize, MatmulSetupError> {
        Ok(GemmTiles::<P>::describe(self)?.usage(tier))
    }

    /// Check the scheme can run on the target.
    ///
    /// Tiles must be whole numbers of fractal blocks and every double buffered ring must fit in
    /// its tier.
    pub fn validate<P: MatmulPrecision>(
        &self,
        properties: &TargetProperties,
    ) -> Result<(), MatmulSetupError> {
        let tiles = GemmTiles::<P>::describe(self)?;
        for tier in TierKind::ALL {
            let required = tiles.usage(tier);
            let capacity = properties.tier(tier).capacity;
            log::debug!("Tiling {self:?} reserves {required} of {capacity} bytes in the {tier} tier");

            if required > capacity {
                return Err(MatmulAvailabilityError::TierTooSmall {
                    tier,
                    required,
                    capacity,
                }
                .into());
            }
        }

        if usize::from(properties.events_per_pair) < STAGES {
            return Err(MatmulAvailabilityError::EventsUnavailable {
                required: STAGES as u8,
                available: properties.events_per_pair,
            }
            .into());
        }

        Ok(())
    }
}

/// Builder of [TilingScheme].
#[derive(Debug, Default)]
pub struct TilingSchemeBuilder {
    base: Option<(usize, usize, usize)>,
    step_k: Option<usize>,
}

impl TilingSchemeBuilder {
    /// Output tile of `m x n` and `k` contraction per product.
    pub fn with_base(mut self, m: usize, n: usize, k: usize) -> Self {
        self.base = Some((m, n, k));
        self
    }

    /// Products per staging slab, one when unset.
    pub fn with_step_k(mut self, step_k: usize) -> Self {
        self.step_k = Some(step_k);
        self
    }

    pub fn build(self) -> Result<TilingScheme, MatmulSetupError> {
        let (base_m, base_n, base_k) = self
            .base
            .ok_or_else(|| MatmulSetupError::InvalidConfig("Missing base tile".to_string()))?;
        let step_k = self.step_k.unwrap_or(1);

        if [base_m, base_n, base_k, step_k].contains(&0) {
            return Err(MatmulSetupError::InvalidConfig(format!(
                "Empty tiling base_m={base_m} base_n={base_n} base_k={base_k} step_k={step_k}"
            )));
        }

        Ok(TilingScheme {
            base_m,
            base_n,
            base_k,
            step_k,
        })
    }
}

/// Unplaced descriptors of the tiles of one ring slot.
pub(crate) struct GemmTiles<P: MatmulPrecision> {
    pub lhs_stage: Tile<P::Input>,
    pub rhs_stage: Tile<P::Input>,
    pub left: Tile<P::Input>,
    pub right: Tile<P::Input>,
    pub acc: Tile<P::Acc>,
}

impl<P: MatmulPrecision> GemmTiles<P> {
    pub(crate) fn describe(tiling: &TilingScheme) -> Result<Self, MatmulSetupError> {
        Self::build(tiling).map_err(|err| MatmulSetupError::InvalidConfig(err.to_string()))
    }

    fn usage(&self, tier: TierKind) -> usize {
        match tier {
            TierKind::Staging => STAGES * (self.lhs_stage.size_bytes() + self.rhs_stage.size_bytes()),
            TierKind::Left => STAGES * self.left.size_bytes(),
            TierKind::Right => STAGES * self.right.size_bytes(),
            TierKind::Accumulator => self.acc.size_bytes(),
            TierKind::Vector => 0,
        }
    }

    fn build(tiling: &TilingScheme) -> Result<Self, TileError> {
        let &TilingScheme {
            base_m,
            base_n,
            base_k,
            ..
        } = tiling;
        let slab_k = tiling.slab_k();
        let staging = TileLayout::Fractal(Fractal::nz::<P::Input>());

        Ok(Self {
            lhs_stage: Tile::builder(TierKind::Staging, base_m, slab_k)
                .layout(staging)
                .build()?,
            rhs_stage: Tile::builder(TierKind::Staging, slab_k, base_n)
                .layout(staging)
                .build()?,
            left: Tile::builder(TierKind::Left, base_m, base_k)
                .layout(TileLayout::Fractal(Fractal::zz::<P::Input>()))
                .build()?,
            right: Tile::builder(TierKind::Right, base_k, base_n)
                .layout(TileLayout::Fractal(Fractal::zn::<P::Input>()))
                .build()?,
            acc: Tile::builder(TierKind::Accumulator, base_m, base_n)
                .layout(TileLayout::Fractal(Fractal::accumulator()))
                .build()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use half::f16;
    use tilepipe_runtime::target::{Target, TrainingTarget};

    fn scheme(m: usize, n: usize, k: usize, step_k: usize) -> TilingScheme {
        TilingScheme::builder()
            .with_base(m, n, k)
            .with_step_k(step_k)
            .build()
            .unwrap()
    }

    #[test]
    fn reference_tiling_fills_the_training_tiers() {
        let tiling = scheme(128, 256, 64, 2);

        assert_eq!(tiling.tier_usage::<f16>(TierKind::Accumulator), Ok(128 * 1024));
        assert_eq!(tiling.tier_usage::<f16>(TierKind::Right), Ok(64 * 1024));
        assert_eq!(tiling.validate::<f16>(&TrainingTarget::properties()), Ok(()));
    }

    #[test]
    fn oversized_accumulator_is_rejected() {
        let tiling = scheme(256, 256, 64, 1);

        assert_eq!(
            tiling.validate::<f16>(&TrainingTarget::properties()),
            Err(MatmulSetupError::Unavailable(
                MatmulAvailabilityError::TierTooSmall {
                    tier: TierKind::Accumulator,
                    required: 256 * 1024,
                    capacity: 128 * 1024,
                }
            ))
        );
    }

    #[test]
    fn partial_blocks_are_rejected() {
        let tiling = scheme(24, 64, 64, 1);

        assert!(matches!(
            tiling.validate::<f16>(&TrainingTarget::properties()),
            Err(MatmulSetupError::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_tiling_is_rejected() {
        let result = TilingScheme::builder()
            .with_base(64, 64, 64)
            .with_step_k(0)
            .build();

        assert!(matches!(result, Err(MatmulSetupError::InvalidConfig(_))));
    }
}
