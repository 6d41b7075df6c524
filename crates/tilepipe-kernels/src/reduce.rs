use tilepipe_common::Element;
use tilepipe_core::{
    GlobalTensor, PadValue, Tile, TileError,
    ops::{self, load, store},
};
use tilepipe_runtime::{Device, KernelContext, pipe::PipeKind, tier::TierKind};

use crate::{
    CoreRange, KernelError, TilePartition,
    pipeline::{BufferRing, SlotRoles},
};

/// Reduction applied to every row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ReduceOp {
    /// Sum of the row.
    Sum,
    /// Largest element of the row.
    Max,
}

impl ReduceOp {
    /// Padding making invalid elements neutral for the reduction.
    pub fn neutral_pad(self) -> PadValue {
        match self {
            ReduceOp::Sum => PadValue::Zero,
            ReduceOp::Max => PadValue::Min,
        }
    }

    fn reduce<E: Element>(
        self,
        ctx: &mut KernelContext<'_>,
        dst: &Tile<E>,
        src: &Tile<E>,
    ) -> Result<(), TileError> {
        match self {
            ReduceOp::Sum => ops::row_sum(ctx, dst, src),
            ReduceOp::Max => ops::row_max(ctx, dst, src),
        }
    }

    fn combine<E: Element>(
        self,
        ctx: &mut KernelContext<'_>,
        acc: &Tile<E>,
        partial: &Tile<E>,
    ) -> Result<(), TileError> {
        match self {
            ReduceOp::Sum => ops::add(ctx, acc, acc, partial),
            ReduceOp::Max => ops::max(ctx, acc, acc, partial),
        }
    }
}

/// Tile shape of [launch_row_reduce].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, new, serde::Serialize, serde::Deserialize)]
pub struct ReduceConfig {
    /// Rows of a tile.
    pub tile_rows: usize,
    /// Columns of a tile.
    pub tile_cols: usize,
}

/// Reduce every row of `input` into the `rows x 1` tensor `output`.
///
/// Blocks own whole row tiles and walk their columns tile by tile. Input tiles are padded with
/// the neutral value of the reduction, so the short edge tile reduces like the others. Each
/// block keeps its partial results in a ping-pong pair of accumulators: the vector pipe fills
/// one while the store pipe drains the other.
pub fn launch_row_reduce<E: Element>(
    device: &mut Device,
    op: ReduceOp,
    input: &GlobalTensor<E>,
    output: &GlobalTensor<E>,
    config: ReduceConfig,
    grid: usize,
) -> Result<(), KernelError> {
    let (rows, cols) = input.shape();
    if output.shape() != (rows, 1) {
        return Err(TileError::ShapeMismatch {
            op: "row_reduce",
            expected: (rows, 1),
            actual: output.shape(),
        }
        .into());
    }

    let rows = TilePartition::new(rows, config.tile_rows)?;
    let cols = TilePartition::new(cols, config.tile_cols)?;
    log::debug!(
        "Row {op:?} of {} row tile(s) in {} column step(s) on {grid} block(s)",
        rows.count(),
        cols.count()
    );

    device.launch(grid, |ctx| -> Result<(), KernelError> {
        let range = CoreRange::of(rows.count(), ctx.block_idx(), ctx.block_num());
        if range.is_empty() {
            return Ok(());
        }

        let mut input_tile = || {
            Tile::<E>::builder(TierKind::Vector, config.tile_rows, config.tile_cols)
                .pad(op.neutral_pad())
                .alloc(ctx)
        };
        let mut inputs = BufferRing::ping_pong(
            SlotRoles::pair(PipeKind::Load, PipeKind::Vector),
            input_tile()?,
            input_tile()?,
        );

        let mut column = || Tile::<E>::builder(TierKind::Vector, config.tile_rows, 1).alloc(ctx);
        let mut partial = column()?;
        let mut accumulators = BufferRing::ping_pong(
            SlotRoles::pair(PipeKind::Vector, PipeKind::Store),
            column()?,
            column()?,
        );

        let mut loaded = 0;
        for (iteration, row_tile) in range.iter().enumerate() {
            let (row, valid_rows) = rows.tile(row_tile);
            let acc_slot = accumulators.slot_for(iteration);
            let acc = accumulators.begin_load(ctx, acc_slot)?;
            acc.set_valid(valid_rows, 1)?;
            let acc = *acc;
            partial.set_valid(valid_rows, 1)?;

            for (step, (col, valid_cols)) in cols.tiles().enumerate() {
                let slot = inputs.slot_for(loaded);
                loaded += 1;

                let tile = inputs.begin_load(ctx, slot)?;
                tile.set_valid(valid_rows, valid_cols)?;
                let tile = *tile;
                load(ctx, &tile, &input.window(row, col, valid_rows, valid_cols)?)?;
                inputs.end_load(ctx, slot)?;

                inputs.begin_consume(ctx, slot)?;
                if step == 0 {
                    op.reduce(ctx, &acc, &tile)?;
                } else {
                    op.reduce(ctx, &partial, &tile)?;
                    op.combine(ctx, &acc, &partial)?;
                }
                inputs.end_consume(ctx, slot)?;
            }

            accumulators.end_load(ctx, acc_slot)?;
            accumulators.begin_consume(ctx, acc_slot)?;
            store(ctx, &output.window(row, 0, valid_rows, 1)?, &acc)?;
            accumulators.end_consume(ctx, acc_slot)?;
        }

        inputs.drain(ctx)?;
        accumulators.drain(ctx)
    })
}
