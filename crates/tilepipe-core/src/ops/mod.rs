//! Operators issue a single operation on the pipe that executes them.
//!
//! Preconditions are checked at issue time and reported as [TileError](crate::TileError).
//! Vector operators work on row-major tiles of the vector tier and write exactly the valid
//! region of their destination.

mod check;

mod convert;
mod elementwise;
mod expand;
mod gather;
mod matmul;
mod movement;
mod reduce;
mod sort;

pub use convert::*;
pub use elementwise::*;
pub use expand::*;
pub use gather::*;
pub use matmul::*;
pub use movement::*;
pub use reduce::*;
pub use sort::*;
