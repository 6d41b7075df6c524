mod clock;
mod hazard;

pub use clock::*;
pub(crate) use hazard::*;
