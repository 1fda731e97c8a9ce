//! Topic-based event bus for grasp runtime events.
//!
//! Scan lifecycle events and grant bookkeeping are published on separate
//! topics so consumers subscribe only to what they need.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{GrantEvent, RevokeReason, ScanEvent, ScanHit};
