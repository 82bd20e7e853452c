//! Facade consumed by the HTTP layer

mod classify;
mod conflicts;
mod parse;
mod registry;
mod versions;

pub use classify::*;
pub use conflicts::*;
pub use parse::*;
pub use registry::*;
pub use versions::*;
