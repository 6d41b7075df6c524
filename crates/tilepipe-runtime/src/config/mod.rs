/// Pipeline config module.
pub mod pipeline;
/// Validation config module.
pub mod validation;

mod base;
mod logger;

pub use base::*;
pub use logger::*;
