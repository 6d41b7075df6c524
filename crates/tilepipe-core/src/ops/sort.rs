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

/// Direction of a sort.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// Sort every valid row of `src`, writing the sorted values and their source columns.
///
/// The sort is stable and compares values with [f64::total_cmp].
pub fn sort_rows<E: Element>(
    ctx: &mut KernelContext<'_>,
    values: &Tile<E>,
    indices: &Tile<u32>,
    src: &Tile<E>,
    order: SortOrder,
) -> Result<(), TileError> {
    let out = vector_operand("sort_rows", values)?;
    let idx = vector_operand("sort_rows", indices)?;
    let src = vector_operand("sort_rows", src)?;
    let (rows, cols) = src.tile().valid_shape();
    expect_valid("sort_rows", (rows, cols), values.valid_shape())?;
    expect_valid("sort_rows", (rows, cols), indices.valid_shape())?;

    let op = PipeOp::new("sort_rows", move |memory| {
        let tier = memory.tier_mut(TierKind::Vector);
        let mut sorted = alloc::vec::Vec::with_capacity(rows);
        for row in 0..rows {
            let mut entries: alloc::vec::Vec<(E, u32)> = (0..cols)
                .map(|col| (src.read(tier, row, col), col as u32))
                .collect();
            entries.sort_by(|a, b| {
                let ordering = a.0.to_f64().total_cmp(&b.0.to_f64());
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
            sorted.push(entries);
        }

        for (row, entries) in sorted.into_iter().enumerate() {
            for (col, (value, index)) in entries.into_iter().enumerate() {
                out.write(tier, row, col, value);
                idx.write(tier, row, col, index);
            }
        }
        Ok(())
    })
    .reads(Resource::Tier(TierKind::Vector), src.range())
    .writes(Resource::Tier(TierKind::Vector), out.range())
    .writes(Resource::Tier(TierKind::Vector), idx.range());

    ctx.issue(PipeKind::Vector, op)?;
    Ok(())
}
