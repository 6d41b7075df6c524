//! Stride construction helpers.

mod layout_builders;

pub use layout_builders::*;
