//! pd-cli: operator console for PrizeDraw sessions
//!
//! The `prizedraw` binary parses arguments and prints; session work lives in
//! the command functions here so it can run against a temporary directory.

mod commands;
mod config;
mod report;

pub use commands::*;
pub use config::*;
pub use report::*;
