//! Event sources and session sinks for the sessionizer.
//!
//! The sessionization core never touches I/O. This crate fetches the input
//! event batch and delivers the computed sessions, over HTTP or the local
//! filesystem.

pub mod config;
pub mod sink;
pub mod source;

pub use config::*;
pub use sink::*;
pub use source::*;
