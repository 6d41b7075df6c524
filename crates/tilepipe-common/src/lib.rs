#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! Common utilities shared by the tilepipe crates.

extern crate alloc;

/// Backtrace module to build error reports.
pub mod backtrace;

/// Element types that can live in tiles and global tensors.
pub mod elem;

/// Random value generation used by host harnesses.
pub mod rand;

pub use elem::{DType, Element};
