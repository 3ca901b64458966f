//! Shared utilities for cuekeeper
//!
//! This crate provides:
//! - ID types (TableId, ClientId)
//! - Wall-clock time with a development mock-time override
//! - Duration formatting helpers
//! - Default paths for socket, data, and config files

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
