//! Session ledger and table state machine for cuekeeperd
//!
//! This crate is the heart of cuekeeperd, containing:
//! - The per-table state machine (Available -> Running <-> Paused -> Available)
//! - Lazy elapsed-time folding on pause and end
//! - Billing of ended sessions
//! - The ledger that owns every table and persists after each mutation

mod billing;
mod events;
mod ledger;
mod session;

pub use billing::*;
pub use events::*;
pub use ledger::*;
pub use session::*;
