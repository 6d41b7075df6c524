//! Tiles, global tensors and the operators moving and computing on them.
//!
//! Every operator checks its preconditions when it is issued, then appends a single operation to
//! the queue of the pipe that executes it. Nothing runs until the pipes drain.

extern crate alloc;

#[macro_use]
extern crate derive_new;

mod error;
mod global;
mod layout;
mod pad;
mod tile;

/// Data movement and compute operators.
pub mod ops;

pub use error::*;
pub use global::*;
pub use layout::*;
pub use pad::*;
pub use tile::*;

/// Host references and tolerance helpers shared by the test suites.
#[cfg(feature = "export_tests")]
pub mod tests;
