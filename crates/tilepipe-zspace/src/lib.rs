//! # Shape and Stride Utilities for `tilepipe`
//!
//! Descriptors shared by global tensors and tiles:
//! - [Shape] and [Strides], inline up to [MAX_RANK] dimensions.
//! - [ShapeDecl], a declared shape whose extents can be static or supplied at run time.
//! - [ShapeStride], a validated (extent, stride) tuple used for strided addressing.
//!
//! Everything in here is a pure value type without any dependency on the runtime.

#![no_std]

extern crate alloc;

pub mod errors;
pub mod indexing;
pub mod striding;

/// Maximum number of logical dimensions a descriptor can carry.
pub const MAX_RANK: usize = 5;

pub(crate) const INLINE_DIMS: usize = MAX_RANK;

mod decl;
mod shape;
mod shape_stride;
mod strides;

pub use decl::*;
pub use errors::ShapeError;
pub use shape::*;
pub use shape_stride::*;
pub use strides::*;

/// Reexport for use in macros
pub use smallvec::{SmallVec, smallvec};
