//! Service implementations for the registry engine

mod classifier;
mod conflict;
mod heuristics;
mod parser;
mod store;
mod version_control;

pub use classifier::*;
pub use conflict::*;
pub use heuristics::*;
pub use parser::*;
pub use store::*;
pub use version_control::*;
