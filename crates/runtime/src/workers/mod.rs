//! Worker tasks that back the runtime orchestration.
//!
//! The scan worker is the only task that touches the grant ledger; handles
//! talk to it over a command channel.

mod scan;

pub use scan::{Command, ScanStatus, ScanWorker};
