use tilepipe_common::Element;
use tilepipe_runtime::{
    KernelContext,
    pipe::{PipeKind, PipeOp, Resource},
    tier::TierKind,
};

use crate::{
    Tile, TileError,
    ops::check::{expect_fractal, expect_tier, expect_valid},
};

/// Whether a matrix product overwrites or adds to its accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatmulMode {
    /// `acc = left * right`, used on the first step of a contraction.
    Initialize,
    /// `acc += left * right`.
    Accumulate,
}

impl MatmulMode {
    /// Initialize on the first step of the contraction, accumulate afterwards.
    pub fn for_step(k: usize) -> Self {
        if k == 0 {
            MatmulMode::Initialize
        } else {
            MatmulMode::Accumulate
        }
    }
}

/// Matrix product of the valid regions of `left` (m x k) and `right` (k x n) into `acc` (m x n).
///
/// Operands must sit in the left, right and accumulator tiers with fractal layouts. Products
/// are summed in `f64` and rounded once to the accumulator type.
pub fn matmul<A: Element, E: Element>(
    ctx: &mut KernelContext<'_>,
    acc: &Tile<A>,
    left: &Tile<E>,
    right: &Tile<E>,
    mode: MatmulMode,
) -> Result<(), TileError> {
    expect_tier("matmul", acc, TierKind::Accumulator)?;
    expect_tier("matmul", left, TierKind::Left)?;
    expect_tier("matmul", right, TierKind::Right)?;
    expect_fractal("matmul", acc)?;
    expect_fractal("matmul", left)?;
    expect_fractal("matmul", right)?;

    let (m, n) = acc.valid_shape();
    let k = left.valid_cols();
    expect_valid("matmul", (m, k), left.valid_shape())?;
    expect_valid("matmul", (k, n), right.valid_shape())?;

    let out = acc.placed()?;
    let lhs = left.placed()?;
    let rhs = right.placed()?;

    let mut op = PipeOp::new("matmul", move |memory| {
        let a = lhs.read_valid(memory.tier(TierKind::Left));
        let b = rhs.read_valid(memory.tier(TierKind::Right));

        let tier = memory.tier_mut(TierKind::Accumulator);
        for row in 0..m {
            for col in 0..n {
                let mut sum = match mode {
                    MatmulMode::Initialize => 0.0,
                    MatmulMode::Accumulate => out.read(tier, row, col).to_f64(),
                };
                for i in 0..k {
                    sum += a[row * k + i] * b[i * n + col];
                }
                out.write(tier, row, col, A::from_f64(sum));
            }
        }
        Ok(())
    })
    .reads(Resource::Tier(TierKind::Left), lhs.range())
    .reads(Resource::Tier(TierKind::Right), rhs.range());
    if mode == MatmulMode::Accumulate {
        op = op.reads(Resource::Tier(TierKind::Accumulator), out.range());
    }
    let op = op.writes(Resource::Tier(TierKind::Accumulator), out.range());

    ctx.issue(PipeKind::Matrix, op)?;
    Ok(())
}
