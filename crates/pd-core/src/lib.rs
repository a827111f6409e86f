//! pd-core: Shared types, errors, and the eligibility rule for PrizeDraw
//!
//! Every other PrizeDraw crate builds on these types.

mod eligibility;
mod error;
mod participant;
mod plan;
mod prize;
mod stage;

pub use eligibility::*;
pub use error::*;
pub use participant::*;
pub use plan::*;
pub use prize::*;
pub use stage::*;
