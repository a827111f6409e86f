//! pd-state: Session snapshots and crash-safe persistence
//!
//! Provides the durable side of a draw session:
//! - Versioned, checksummed snapshot documents
//! - Atomic local writes with history rotation
//! - Recovery from the newest valid copy
//! - Best-effort secondary mirror

mod error;
mod mirror;
mod snapshot;
mod store;

pub use error::*;
pub use mirror::*;
pub use snapshot::*;
pub use store::*;
