//! Double buffered matrix multiplication.
//!
//! Operands flow from global memory to the staging tier (load pipe), from staging to the
//! operand tiers (move pipe) and into a single accumulator (matrix pipe), which the fixup pipe
//! drains to the output. Both hops are double buffered, so each pipe works on the next tile
//! while its consumer works on the current one.

mod error;
mod kernel;
mod launch;
mod precision;
mod problem;
mod tiling;

pub use error::*;
pub use launch::*;
pub use precision::*;
pub use problem::*;
pub use tiling::TilingScheme;
pub use tiling::TilingSchemeBuilder;

pub(crate) use kernel::GemmKernel;
pub(crate) use tiling::GemmTiles;
