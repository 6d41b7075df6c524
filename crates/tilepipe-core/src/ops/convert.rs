use tilepipe_common::Element;
use tilepipe_runtime::{
    KernelContext,
    pipe::{PipeKind, PipeOp, Resource},
    tier::TierKind,
};

use crate::{
    Tile, TileError,
    ops::check::{expect_valid, vector_operand},
};

/// Convert elements, rounding to nearest and saturating integers.
pub fn cast<D: Element, S: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<D>,
    src: &Tile<S>,
) -> Result<(), TileError> {
    map("cast", ctx, dst, src, |x| x)
}

/// `q = round(x / scale + offset)`, saturated to the range of `Q`.
pub fn quantize<Q: Element, F: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<Q>,
    src: &Tile<F>,
    scale: f64,
    offset: f64,
) -> Result<(), TileError> {
    map("quantize", ctx, dst, src, move |x| (x / scale + offset).round())
}

/// `x = (q - offset) * scale`.
pub fn dequantize<F: Element, Q: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<F>,
    src: &Tile<Q>,
    scale: f64,
    offset: f64,
) -> Result<(), TileError> {
    map("dequantize", ctx, dst, src, move |q| (q - offset) * scale)
}

pub(crate) fn map<D: Element, S: Element, F>(
    name: &'static str,
    ctx: &mut KernelContext<'_>,
    dst: &Tile<D>,
    src: &Tile<S>,
    func: F,
) -> Result<(), TileError>
where
    F: Fn(f64) -> f64 + 'static,
{
    let out = vector_operand(name, dst)?;
    let src = vector_operand(name, src)?;
    expect_valid(name, src.tile().valid_shape(), dst.valid_shape())?;

    let op = PipeOp::new(name, move |memory| {
        let tier = memory.tier_mut(TierKind::Vector);
        let values: alloc::vec::Vec<f64> = src.read_valid(tier).into_iter().map(&func).collect();
        out.write_valid(tier, &values);
        Ok(())
    })
    .reads(Resource::Tier(TierKind::Vector), src.range())
    .writes(Resource::Tier(TierKind::Vector), out.range());

    ctx.issue(PipeKind::Vector, op)?;
    Ok(())
}
