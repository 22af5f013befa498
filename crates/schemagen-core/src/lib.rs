//! Core types for the schema generator.
//!
//! Profiles, dialects, the schema model handed over by a [`SchemaBuilder`],
//! and the pure post-processing stages that run on top of it: metadata
//! extraction, creation-script deduplication and report rendering.
//!
//! This crate does no file-system work; callers own all I/O.

pub mod builder;
pub mod dedup;
pub mod dialect;
pub mod error;
pub mod metadata;
pub mod model;
pub mod profile;
pub mod report;

pub use builder::{SchemaBuilder, ScriptAction};
pub use dialect::Dialect;
pub use error::{Error, Result};
pub use profile::Profile;
