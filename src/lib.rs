//! repo-watch - supervisor for the file-change daemon.

pub mod config;
pub mod daemon;
pub mod display;
pub mod supervisor;
