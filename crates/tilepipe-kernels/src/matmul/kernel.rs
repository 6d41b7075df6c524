use alloc::vec;

use tilepipe_core::{
    GlobalTensor, Tile, TilePlacement,
    ops::{MatmulMode, extract, load, matmul, store},
};
use tilepipe_runtime::{KernelContext, pipe::PipeKind};

use crate::{
    CoreRange, KernelError, TilePartition,
    matmul::{GemmTiles, MatmulPrecision, MatmulProblem, TilingScheme},
    pipeline::{BufferRing, SlotRoles},
};

/// Staging slab of one K step: `base_m x slab_k` of lhs and `slab_k x base_n` of rhs.
#[derive(Clone, Copy)]
struct StageTiles<P: MatmulPrecision> {
    lhs: Tile<P::Input>,
    rhs: Tile<P::Input>,
}

/// Operands of one matrix product.
#[derive(Clone, Copy)]
struct OperandTiles<P: MatmulPrecision> {
    left: Tile<P::Input>,
    right: Tile<P::Input>,
}

/// Output tile a block is working on.
#[derive(Clone, Copy, Debug)]
struct OutputTile {
    row: usize,
    col: usize,
    rows: usize,
    cols: usize,
}

/// Rings of one block.
///
/// The staging ring double buffers slabs between the load and move pipes, the operand ring
/// double buffers operands between the move and matrix pipes. The single accumulator cycles
/// between the matrix pipe, which fills it over the whole contraction, and the fixup pipe
/// draining it to global memory.
struct GemmRings<P: MatmulPrecision> {
    stage: BufferRing<StageTiles<P>>,
    operands: BufferRing<OperandTiles<P>>,
    acc: BufferRing<Tile<P::Acc>>,
    /// Slabs loaded so far, selects the staging slot.
    slabs: usize,
    /// Products issued so far, selects the operand slot.
    products: usize,
}

/// Matmul of one block, on the output tiles of its share.
#[derive(new)]
pub(crate) struct GemmKernel<'a, P: MatmulPrecision> {
    problem: MatmulProblem,
    tiling: TilingScheme,
    lhs: &'a GlobalTensor<P::Input>,
    rhs: &'a GlobalTensor<P::Input>,
    out: &'a GlobalTensor<P::Output>,
}

impl<P: MatmulPrecision> GemmKernel<'_, P> {
    /// Number of output tiles of the problem.
    pub(crate) fn num_output_tiles(&self) -> Result<usize, KernelError> {
        let (rows, cols) = self.output_partitions()?;
        Ok(rows.count() * cols.count())
    }

    pub(crate) fn execute(&self, ctx: &mut KernelContext<'_>) -> Result<(), KernelError> {
        let (rows, cols) = self.output_partitions()?;
        let range = CoreRange::of(rows.count() * cols.count(), ctx.block_idx(), ctx.block_num());
        if range.is_empty() {
            return Ok(());
        }

        let mut rings = self.alloc_rings(ctx)?;

        for index in range.iter() {
            let (row, valid_rows) = rows.tile(index / cols.count());
            let (col, valid_cols) = cols.tile(index % cols.count());
            let output = OutputTile {
                row,
                col,
                rows: valid_rows,
                cols: valid_cols,
            };
            self.compute_output_tile(ctx, &mut rings, output)?;
        }

        rings.stage.drain(ctx)?;
        rings.operands.drain(ctx)?;
        rings.acc.drain(ctx)
    }

    fn output_partitions(&self) -> Result<(TilePartition, TilePartition), KernelError> {
        Ok((
            TilePartition::new(self.problem.m, self.tiling.base_m)?,
            TilePartition::new(self.problem.n, self.tiling.base_n)?,
        ))
    }

    fn alloc_rings(&self, ctx: &mut KernelContext<'_>) -> Result<GemmRings<P>, KernelError> {
        let tiles = GemmTiles::<P>::describe(&self.tiling)?;

        let mut stage = || -> Result<StageTiles<P>, KernelError> {
            let (mut lhs, mut rhs) = (tiles.lhs_stage, tiles.rhs_stage);
            ctx.alloc(&mut lhs)?;
            ctx.alloc(&mut rhs)?;
            Ok(StageTiles { lhs, rhs })
        };
        let stage = BufferRing::ping_pong(
            SlotRoles::pair(PipeKind::Load, PipeKind::Move),
            stage()?,
            stage()?,
        );

        let mut operands = || -> Result<OperandTiles<P>, KernelError> {
            let (mut left, mut right) = (tiles.left, tiles.right);
            ctx.alloc(&mut left)?;
            ctx.alloc(&mut right)?;
            Ok(OperandTiles { left, right })
        };
        let operands = BufferRing::ping_pong(
            SlotRoles::pair(PipeKind::Move, PipeKind::Matrix),
            operands()?,
            operands()?,
        );

        let mut acc = tiles.acc;
        ctx.alloc(&mut acc)?;
        let acc = BufferRing::new(SlotRoles::pair(PipeKind::Matrix, PipeKind::Fixup), vec![acc])?;

        Ok(GemmRings {
            stage,
            operands,
            acc,
            slabs: 0,
            products: 0,
        })
    }

    /// Contract the whole K dimension into the accumulator, then store it.
    ///
    /// The first slab is loaded ahead, then every iteration loads the next slab before
    /// computing the current one.
    fn compute_output_tile(
        &self,
        ctx: &mut KernelContext<'_>,
        rings: &mut GemmRings<P>,
        output: OutputTile,
    ) -> Result<(), KernelError> {
        let slabs = TilePartition::new(self.problem.k, self.tiling.slab_k())?;

        let acc = rings.acc.begin_load(ctx, 0)?;
        acc.set_valid(output.rows, output.cols)?;
        let acc = *acc;

        let first = rings.slabs;
        self.load_slab(ctx, rings, output, slabs.tile(0))?;
        for index in 0..slabs.count() {
            if index + 1 < slabs.count() {
                self.load_slab(ctx, rings, output, slabs.tile(index + 1))?;
            }
            self.execute_slab(ctx, rings, &acc, first + index, index * self.tiling.step_k)?;
        }

        rings.acc.end_load(ctx, 0)?;
        rings.acc.begin_consume(ctx, 0)?;
        store(
            ctx,
            &self.out.window(output.row, output.col, output.rows, output.cols)?,
            &acc,
        )?;
        rings.acc.end_consume(ctx, 0)
    }

    fn load_slab(
        &self,
        ctx: &mut KernelContext<'_>,
        rings: &mut GemmRings<P>,
        output: OutputTile,
        (k, valid_k): (usize, usize),
    ) -> Result<(), KernelError> {
        let slot = rings.stage.slot_for(rings.slabs);
        rings.slabs += 1;

        let tiles = rings.stage.begin_load(ctx, slot)?;
        tiles.lhs.set_valid(output.rows, valid_k)?;
        tiles.rhs.set_valid(valid_k, output.cols)?;
        let tiles = *tiles;

        load(ctx, &tiles.lhs, &self.lhs.window(output.row, k, output.rows, valid_k)?)?;
        load(ctx, &tiles.rhs, &self.rhs.window(k, output.col, valid_k, output.cols)?)?;
        rings.stage.end_load(ctx, slot)
    }

    /// Peel the slab into `base_k` operands and accumulate their products.
    ///
    /// `first_step` is the index of the first product of the slab in the contraction, only the
    /// product of step zero initializes the accumulator.
    fn execute_slab(
        &self,
        ctx: &mut KernelContext<'_>,
        rings: &mut GemmRings<P>,
        acc: &Tile<P::Acc>,
        slab: usize,
        first_step: usize,
    ) -> Result<(), KernelError> {
        let slot = rings.stage.slot_for(slab);
        let stage = *rings.stage.begin_consume(ctx, slot)?;
        let (rows, valid_k) = stage.lhs.valid_shape();
        let cols = stage.rhs.valid_cols();

        let steps = TilePartition::new(valid_k, self.tiling.base_k)?;
        for (step, (k, valid)) in steps.tiles().enumerate() {
            let l0 = rings.operands.slot_for(rings.products);
            rings.products += 1;

            let operands = rings.operands.begin_load(ctx, l0)?;
            operands.left.set_valid(rows, valid)?;
            operands.right.set_valid(valid, cols)?;
            let operands = *operands;
            extract(ctx, &operands.left, &stage.lhs, 0, k)?;
            extract(ctx, &operands.right, &stage.rhs, k, 0)?;
            rings.operands.end_load(ctx, l0)?;

            rings.operands.begin_consume(ctx, l0)?;
            matmul(
                ctx,
                acc,
                &operands.left,
                &operands.right,
                MatmulMode::for_step(first_step + step),
            )?;
            rings.operands.end_consume(ctx, l0)?;
        }

        rings.stage.end_consume(ctx, slot)
    }
}
