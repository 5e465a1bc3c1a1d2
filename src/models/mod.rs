//! Data models for the designer directory.
//!
//! Field names serialize in camelCase to match what the directory page reads.

mod directory;
mod facet;
mod talent;

pub use directory::*;
pub use facet::*;
pub use talent::*;
