//! Parameter-to-material synchronization
//!
//! [`MaterialSynchronizer`] owns the parameter snapshot, the texture cache and
//! the debounce timers, and applies changes to the label nodes it drives.

mod scheduler;
mod synchronizer;


pub use scheduler::{DebounceScheduler, PendingUpdate};
pub use synchronizer::{MaterialSynchronizer, SyncError, SyncOutcome, SyncStats, TargetState};
