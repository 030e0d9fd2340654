//! Configuration module.

mod expand;
mod loader;
mod types;

pub use expand::*;
pub use loader::*;
pub use types::*;
