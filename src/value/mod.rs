pub mod convert;
pub mod map;
pub mod types;

pub use convert::*;
pub use map::*;
pub use types::*;
