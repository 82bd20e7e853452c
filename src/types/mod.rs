//! Type definitions for the service registry engine

mod config;
mod conflict;
mod error;
mod service;
mod spec;
mod version;

pub use config::*;
pub use conflict::*;
pub use error::*;
pub use service::*;
pub use spec::*;
pub use version::*;
