//! # pd-ingest: Roster ingestion for PrizeDraw
//!
//! Turns an exported participant list into classified [`Participant`]s.
//!
//! ## Accepted Formats
//!
//! 1. **Delimited text** - header row, quoted fields, optional BOM
//! 2. **JSON** - array of flat objects
//!
//! [`Participant`]: pd_core::Participant

pub mod config;
pub mod reader;
pub mod roster;

pub use config::*;
pub use roster::*;
