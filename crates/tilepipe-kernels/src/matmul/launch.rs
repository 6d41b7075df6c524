use alloc::format;

use tilepipe_core::GlobalTensor;
use tilepipe_runtime::Device;

use crate::{
    KernelError,
    matmul::{GemmKernel, MatmulPrecision, MatmulProblem, MatmulSetupError, TilingScheme},
};

/// Launch a matmul computing `out = lhs * rhs`.
///
/// The problem is inferred from the tensors and the tiling validated against the device
/// before anything is launched. Output tiles are shared between the blocks of the grid.
pub fn launch_gemm<P: MatmulPrecision>(
    device: &mut Device,
    lhs: &GlobalTensor<P::Input>,
    rhs: &GlobalTensor<P::Input>,
    out: &GlobalTensor<P::Output>,
    tiling: TilingScheme,
    grid: usize,
) -> Result<(), KernelError> {
    let problem = MatmulProblem::from_tensors(lhs, rhs, out)?;
    if problem.m == 0 || problem.n == 0 || problem.k == 0 {
        return Err(MatmulSetupError::InvalidConfig(format!("Empty problem {problem:?}")).into());
    }
    tiling.validate::<P>(device.properties())?;

    let kernel = GemmKernel::<P>::new(problem, tiling, lhs, rhs, out);
    log::debug!(
        "Matmul {problem:?} with {tiling:?}: {} output tile(s) on {grid} block(s)",
        kernel.num_output_tiles()?
    );

    device.launch(grid, |ctx| kernel.execute(ctx))
}

/// Number of blocks keeping every core busy without idle blocks.
pub fn default_grid(device: &Device, problem: &MatmulProblem, tiling: &TilingScheme) -> usize {
    let tiles = problem.m.div_ceil(tiling.base_m.max(1)) * problem.n.div_ceil(tiling.base_n.max(1));
    tiles.clamp(1, device.properties().num_cores.max(1))
}
