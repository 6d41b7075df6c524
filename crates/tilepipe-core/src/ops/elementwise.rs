use tilepipe_common::Element;
use tilepipe_runtime::{
    KernelContext,
    pipe::{PipeKind, PipeOp, Resource},
    tier::TierKind,
};

use crate::{
    Tile, TileError,
    ops::{
        check::{expect_valid, vector_operand},
        convert::map,
    },
};

macro_rules! binary_op {
    ($(#[$meta:meta])* $name:ident, $func:expr) => {
        $(#[$meta])*
        pub fn $name<E: Element>(
            ctx: &mut KernelContext<'_>,
            dst: &Tile<E>,
            lhs: &Tile<E>,
            rhs: &Tile<E>,
        ) -> Result<(), TileError> {
            binary(ctx, stringify!($name), dst, lhs, rhs, $func)
        }
    };
}

macro_rules! unary_op {
    ($(#[$meta:meta])* $name:ident, $func:expr) => {
        $(#[$meta])*
        pub fn $name<E: Element>(
            ctx: &mut KernelContext<'_>,
            dst: &Tile<E>,
            src: &Tile<E>,
        ) -> Result<(), TileError> {
            map(stringify!($name), ctx, dst, src, $func)
        }
    };
}

binary_op!(
    /// `dst = lhs + rhs`.
    add, |a, b| a + b
);
binary_op!(
    /// `dst = lhs - rhs`.
    sub, |a, b| a - b
);
binary_op!(
    /// `dst = lhs * rhs`.
    mul, |a, b| a * b
);
binary_op!(
    /// `dst = lhs / rhs`.
    div, |a, b| a / b
);
binary_op!(
    /// Elementwise maximum.
    max, f64::max
);
binary_op!(
    /// Elementwise minimum.
    min, f64::min
);

unary_op!(exp, f64::exp);
unary_op!(abs, f64::abs);
unary_op!(neg, |x: f64| -x);
unary_op!(sqrt, f64::sqrt);
unary_op!(
    /// `max(x, 0)`.
    relu, |x: f64| x.max(0.0)
);
unary_op!(
    /// `1 / x`.
    recip, f64::recip
);

/// `dst = src + scalar`.
pub fn adds<E: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<E>,
    src: &Tile<E>,
    scalar: E,
) -> Result<(), TileError> {
    let scalar = scalar.to_f64();
    map("adds", ctx, dst, src, move |x| x + scalar)
}

/// `dst = src * scalar`.
pub fn muls<E: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<E>,
    src: &Tile<E>,
    scalar: E,
) -> Result<(), TileError> {
    let scalar = scalar.to_f64();
    map("muls", ctx, dst, src, move |x| x * scalar)
}

fn binary<E: Element, F>(
    ctx: &mut KernelContext<'_>,
    name: &'static str,
    dst: &Tile<E>,
    lhs: &Tile<E>,
    rhs: &Tile<E>,
    func: F,
) -> Result<(), TileError>
where
    F: Fn(f64, f64) -> f64 + 'static,
{
    let out = vector_operand(name, dst)?;
    let lhs = vector_operand(name, lhs)?;
    let rhs = vector_operand(name, rhs)?;
    expect_valid(name, dst.valid_shape(), lhs.tile().valid_shape())?;
    expect_valid(name, dst.valid_shape(), rhs.tile().valid_shape())?;

    let op = PipeOp::new(name, move |memory| {
        let tier = memory.tier_mut(TierKind::Vector);
        let a = lhs.read_valid(tier);
        let b = rhs.read_valid(tier);
        let values: alloc::vec::Vec<f64> = a.into_iter().zip(b).map(|(a, b)| func(a, b)).collect();
        out.write_valid(tier, &values);
        Ok(())
    })
    .reads(Resource::Tier(TierKind::Vector), lhs.range())
    .reads(Resource::Tier(TierKind::Vector), rhs.range())
    .writes(Resource::Tier(TierKind::Vector), out.range());

    ctx.issue(PipeKind::Vector, op)?;
    Ok(())
}
