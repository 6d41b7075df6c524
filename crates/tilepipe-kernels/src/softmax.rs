use tilepipe_common::Element;
use tilepipe_core::{
    BLOCK_BYTES, GlobalTensor, PadValue, Tile, TileError,
    ops::{exp, fill_pad, load, row_expand_div, row_expand_sub, row_max, row_sum, store},
};
use tilepipe_runtime::{Device, KernelContext, pipe::PipeKind, tier::TierKind};

use crate::{
    CoreRange, KernelError, TilePartition,
    pipeline::{BufferRing, SlotRoles},
};

#[derive(Clone, Copy, Debug)]
struct SoftmaxTiles<E: Element> {
    input: Tile<E>,
    output: Tile<E>,
}

/// Numerically stable softmax of every row of `input` into `output`.
///
/// A tile holds `tile_rows` whole rows, its columns rounded up to a 32-byte block. The input is
/// padded with the lowest value so the row maximum ignores the padding, and the exponentials
/// are re-padded with zero before they are summed.
pub fn launch_softmax_rows<E: Element>(
    device: &mut Device,
    input: &GlobalTensor<E>,
    output: &GlobalTensor<E>,
    tile_rows: usize,
    grid: usize,
) -> Result<(), KernelError> {
    let (rows, cols) = input.shape();
    if output.shape() != (rows, cols) {
        return Err(TileError::ShapeMismatch {
            op: "softmax",
            expected: (rows, cols),
            actual: output.shape(),
        }
        .into());
    }

    let rows = TilePartition::new(rows, tile_rows)?;
    let tile_cols = cols.next_multiple_of(BLOCK_BYTES / size_of::<E>()).max(1);
    log::debug!(
        "Softmax of {} row tile(s) of {tile_rows}x{tile_cols} on {grid} block(s)",
        rows.count()
    );

    device.launch(grid, |ctx| -> Result<(), KernelError> {
        let range = CoreRange::of(rows.count(), ctx.block_idx(), ctx.block_num());
        if range.is_empty() {
            return Ok(());
        }

        let mut slot_tiles = || -> Result<SoftmaxTiles<E>, TileError> {
            Ok(SoftmaxTiles {
                input: Tile::builder(TierKind::Vector, tile_rows, tile_cols)
                    .pad(PadValue::Min)
                    .alloc(ctx)?,
                output: Tile::builder(TierKind::Vector, tile_rows, tile_cols).alloc(ctx)?,
            })
        };
        let mut ring = BufferRing::ping_pong(
            SlotRoles::with_store(PipeKind::Load, PipeKind::Vector, PipeKind::Store),
            slot_tiles()?,
            slot_tiles()?,
        );
        let mut stat = Tile::<E>::builder(TierKind::Vector, tile_rows, 1).alloc(ctx)?;

        for (iteration, row_tile) in range.iter().enumerate() {
            let slot = ring.slot_for(iteration);
            let (row, valid_rows) = rows.tile(row_tile);

            let tiles = ring.begin_load(ctx, slot)?;
            tiles.input.set_valid(valid_rows, cols)?;
            tiles.output.set_valid(valid_rows, cols)?;
            let tiles = *tiles;
            load(ctx, &tiles.input, &input.window(row, 0, valid_rows, cols)?)?;
            ring.end_load(ctx, slot)?;

            ring.begin_consume(ctx, slot)?;
            stat.set_valid(valid_rows, 1)?;
            normalize(ctx, &tiles, &stat)?;
            ring.end_consume(ctx, slot)?;

            ring.begin_store(ctx, slot)?;
            store(ctx, &output.window(row, 0, valid_rows, cols)?, &tiles.output)?;
            ring.end_store(ctx, slot)?;
        }

        ring.drain(ctx)
    })
}

fn normalize<E: Element>(
    ctx: &mut KernelContext<'_>,
    tiles: &SoftmaxTiles<E>,
    stat: &Tile<E>,
) -> Result<(), TileError> {
    let SoftmaxTiles { input, output } = tiles;

    row_max(ctx, stat, input)?;
    row_expand_sub(ctx, output, input, stat)?;
    exp(ctx, output, output)?;
    fill_pad(ctx, output)?;
    row_sum(ctx, stat, output)?;
    row_expand_div(ctx, output, output, stat)
}
