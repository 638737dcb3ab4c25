pub mod pipeline;
pub mod release;
pub mod target;

pub use pipeline::*;
pub use release::*;
pub use target::*;
