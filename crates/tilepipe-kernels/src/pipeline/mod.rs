mod ring;
mod slot;

pub use ring::*;
pub use slot::*;
