mod pipeline;
mod stats;

pub use pipeline::*;
pub use stats::*;
