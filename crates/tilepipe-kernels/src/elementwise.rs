use tilepipe_common::Element;
use tilepipe_core::{
    GlobalTensor, Tile, TileError,
    ops::{self, load, store},
};
use tilepipe_runtime::{Device, KernelContext, pipe::PipeKind, tier::TierKind};

use crate::{
    CoreRange, KernelError, TilePartition,
    pipeline::{BufferRing, SlotRoles},
};

/// Operation applied by [launch_binary].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BinaryOp {
    /// `lhs + rhs`
    Add,
    /// `lhs - rhs`
    Sub,
    /// `lhs * rhs`
    Mul,
    /// `lhs / rhs`
    Div,
    /// Larger of both.
    Max,
    /// Smaller of both.
    Min,
}

impl BinaryOp {
    /// Host version of the operation.
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => lhs / rhs,
            BinaryOp::Max => lhs.max(rhs),
            BinaryOp::Min => lhs.min(rhs),
        }
    }

    fn issue<E: Element>(
        self,
        ctx: &mut KernelContext<'_>,
        dst: &Tile<E>,
        lhs: &Tile<E>,
        rhs: &Tile<E>,
    ) -> Result<(), TileError> {
        match self {
            BinaryOp::Add => ops::add(ctx, dst, lhs, rhs),
            BinaryOp::Sub => ops::sub(ctx, dst, lhs, rhs),
            BinaryOp::Mul => ops::mul(ctx, dst, lhs, rhs),
            BinaryOp::Div => ops::div(ctx, dst, lhs, rhs),
            BinaryOp::Max => ops::max(ctx, dst, lhs, rhs),
            BinaryOp::Min => ops::min(ctx, dst, lhs, rhs),
        }
    }
}

/// Tile shape and buffering depth of the elementwise kernels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, new, serde::Serialize, serde::Deserialize)]
pub struct ElementwiseConfig {
    /// Rows of a tile.
    pub tile_rows: usize,
    /// Columns of a tile.
    pub tile_cols: usize,
    /// Buffer slots, two for ping-pong.
    pub slots: usize,
}

impl ElementwiseConfig {
    /// Ping-pong buffering of `tile_rows x tile_cols` tiles.
    pub fn ping_pong(tile_rows: usize, tile_cols: usize) -> Self {
        Self::new(tile_rows, tile_cols, 2)
    }
}

#[derive(Clone, Copy, Debug)]
struct BinaryTiles<E: Element> {
    lhs: Tile<E>,
    rhs: Tile<E>,
    out: Tile<E>,
}

impl<E: Element> BinaryTiles<E> {
    fn alloc(ctx: &mut KernelContext<'_>, config: &ElementwiseConfig) -> Result<Self, TileError> {
        let mut tile = || {
            Tile::<E>::builder(TierKind::Vector, config.tile_rows, config.tile_cols).alloc(ctx)
        };

        Ok(Self {
            lhs: tile()?,
            rhs: tile()?,
            out: tile()?,
        })
    }

    fn set_valid(&mut self, rows: usize, cols: usize) -> Result<(), TileError> {
        self.lhs.set_valid(rows, cols)?;
        self.rhs.set_valid(rows, cols)?;
        self.out.set_valid(rows, cols)
    }
}

/// Apply `op` to every pair of elements of `lhs` and `rhs`, writing `out`.
///
/// The tensors are cut into tiles handed to the blocks of the grid in contiguous shares. Each
/// tile is loaded, computed and stored through a ring of vector tier slots, so the load pipe
/// fills one slot while the vector pipe computes the other.
pub fn launch_binary<E: Element>(
    device: &mut Device,
    op: BinaryOp,
    lhs: &GlobalTensor<E>,
    rhs: &GlobalTensor<E>,
    out: &GlobalTensor<E>,
    config: ElementwiseConfig,
    grid: usize,
) -> Result<(), KernelError> {
    for shape in [rhs.shape(), out.shape()] {
        if shape != lhs.shape() {
            return Err(TileError::ShapeMismatch {
                op: "elementwise",
                expected: lhs.shape(),
                actual: shape,
            }
            .into());
        }
    }

    let (rows, cols) = lhs.shape();
    let rows = TilePartition::new(rows, config.tile_rows)?;
    let cols = TilePartition::new(cols, config.tile_cols)?;
    let total = rows.count() * cols.count();
    log::debug!(
        "Elementwise {op:?} over {total} tile(s) of {}x{} on {grid} block(s)",
        config.tile_rows,
        config.tile_cols
    );

    device.launch(grid, |ctx| -> Result<(), KernelError> {
        let range = CoreRange::of(total, ctx.block_idx(), ctx.block_num());
        if range.is_empty() {
            return Ok(());
        }

        let slots = (0..config.slots.max(1))
            .map(|_| BinaryTiles::<E>::alloc(ctx, &config))
            .collect::<Result<_, _>>()?;
        let mut ring = BufferRing::new(
            SlotRoles::with_store(PipeKind::Load, PipeKind::Vector, PipeKind::Store),
            slots,
        )?;

        for (iteration, index) in range.iter().enumerate() {
            let slot = ring.slot_for(iteration);
            let (row, valid_rows) = rows.tile(index / cols.count());
            let (col, valid_cols) = cols.tile(index % cols.count());

            let tiles = ring.begin_load(ctx, slot)?;
            tiles.set_valid(valid_rows, valid_cols)?;
            let tiles = *tiles;
            load(ctx, &tiles.lhs, &lhs.window(row, col, valid_rows, valid_cols)?)?;
            load(ctx, &tiles.rhs, &rhs.window(row, col, valid_rows, valid_cols)?)?;
            ring.end_load(ctx, slot)?;

            ring.begin_consume(ctx, slot)?;
            op.issue(ctx, &tiles.out, &tiles.lhs, &tiles.rhs)?;
            ring.end_consume(ctx, slot)?;

            ring.begin_store(ctx, slot)?;
            store(ctx, &out.window(row, col, valid_rows, valid_cols)?, &tiles.out)?;
            ring.end_store(ctx, slot)?;
        }

        ring.drain(ctx)
    })
}
