//! Daemon process lifecycle: pid registry, launch, and signalling.

mod error;
mod launcher;
mod messenger;
mod pid;
mod probe;

pub use error::*;
pub use launcher::*;
pub use messenger::*;
pub use pid::*;
pub use probe::*;
