#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! Simulated accelerator runtime: memory tiers, pipes, fences and kernel launch.
//!
//! A [Device] owns global memory and a set of cores. Each core owns fixed-capacity on-chip
//! tiers and independent pipes, each pipe executing its instruction queue in order. Pipes only
//! order with each other through fences, and a validator checks that they do.

extern crate alloc;

#[macro_use]
extern crate derive_new;

mod id;

/// Configuration module.
pub mod config;
/// Fence module.
pub mod fence;
/// Logging module.
pub mod logging;
/// Memory module.
pub mod memory;
/// Pipe module.
pub mod pipe;
/// Target module.
pub mod target;
/// Tier module.
pub mod tier;
/// Validation module.
pub mod validation;

mod compute;
mod context;
mod device;
mod error;
mod scheduler;

pub use compute::*;
pub use context::*;
pub use device::*;
pub use error::*;
