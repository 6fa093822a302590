//! roster-store — Local persistence for player records.
//!
//! A single SQLite table keyed by national ID, plus whole-store JSON
//! export and import.

pub mod archive;
pub mod store;

pub use archive::ArchiveError;
pub use store::{PlayerStore, StoreError};
