//! Core types and sessionization logic for the sessionizer.

pub mod error;
pub mod events;
pub mod session;
pub mod sessionize;

pub use error::{Error, Result, SinkErrorCode, SourceErrorCode};
pub use events::*;
pub use session::*;
pub use sessionize::*;
