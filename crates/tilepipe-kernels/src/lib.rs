//! Pipelined kernels written with tilepipe tiles.
//!
//! Every kernel splits its problem into tiles, hands a contiguous share of them to each block
//! and streams them through [buffer rings](pipeline::BufferRing), so loading the next tile
//! overlaps computing the current one.

extern crate alloc;

#[macro_use]
extern crate derive_new;

mod error;
mod partition;

/// Elementwise kernels.
pub mod elementwise;
/// Matrix multiplication kernels.
pub mod matmul;
/// Buffer slots and the fences between their producer and consumer pipes.
pub mod pipeline;
/// Row reduction kernels.
pub mod reduce;
/// Softmax kernels.
pub mod softmax;

pub use error::*;
pub use partition::*;
