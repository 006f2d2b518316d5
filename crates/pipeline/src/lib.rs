//! Run orchestration for the sessionizer.
//!
//! Handles the one-shot batch flow:
//! - Fetch (event source → decoded events)
//! - Compute (sequential or parallel sessionization)
//! - Deliver (session sink, with retry)

pub mod config;
pub mod parallel;
pub mod runner;

pub use config::*;
pub use parallel::compute_parallel;
pub use runner::*;
