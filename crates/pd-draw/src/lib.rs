//! # pd-draw: Multi-stage prize draw engine
//!
//! Turns an eligible participant pool into committed winners across three
//! sequential stages, with every round persisted before it is announced.
//!
//! ## Architecture
//!
//! ```text
//! StageOrchestrator
//!     │
//!     ├── DrawPool (eligible minus winners)
//!     ├── DrawSampler (CSPRNG permutations and samples)
//!     ├── tiers (rank → prize)
//!     └── SnapshotStore (pd-state)
//!           │
//!           v
//!     RoundOutcome → validate() → ValidationReport
//! ```

mod orchestrator;
mod pool;
mod sampler;
mod tiers;
mod validator;

pub use orchestrator::*;
pub use pool::*;
pub use sampler::*;
pub use tiers::*;
pub use validator::*;
