//! Tile programming for accelerator cores.
//!
//! Kernels describe tensors in global memory, move tiles of them into the on-chip tiers of a
//! core and compute on those tiles with independent pipes, ordering the pipes with fences.

pub use tilepipe_common as common;
pub use tilepipe_core::*;
pub use tilepipe_runtime as runtime;
pub use tilepipe_zspace as zspace;

#[cfg(feature = "kernels")]
pub use tilepipe_kernels as kernels;

/// Everything needed to write and launch a kernel.
pub mod prelude {
    pub use tilepipe_common::{DType, Element};
    pub use tilepipe_core::{
        Fractal, GlobalLayout, GlobalTensor, GlobalTensorSpec, PadValue, Tile, TileError,
        TileLayout, TilePlacement, ops,
    };
    pub use tilepipe_runtime::{
        Device, ExecutionError, FenceError, KernelContext,
        config::GlobalConfig,
        fence::FenceToken,
        memory::DeviceBuffer,
        pipe::PipeKind,
        target::{DefaultTarget, InferenceTarget, Target, TargetProperties, TrainingTarget},
        tier::TierKind,
    };
    pub use tilepipe_zspace::{Shape, ShapeStride, Strides};

    #[cfg(feature = "kernels")]
    pub use tilepipe_kernels::{
        KernelError,
        elementwise::{BinaryOp, ElementwiseConfig, launch_binary},
        matmul::{MatmulPrecision, TilingScheme, default_grid, launch_gemm},
        pipeline::{BufferRing, SlotRoles},
        reduce::{ReduceConfig, ReduceOp, launch_row_reduce},
        softmax::launch_softmax_rows,
    };
}
