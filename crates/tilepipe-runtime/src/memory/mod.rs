mod arena;
mod global;
mod view;

pub use arena::*;
pub use global::*;
pub use view::*;
