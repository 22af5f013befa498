//! Orchestration for the `schemagen` binary.
//!
//! Turns a [`Job`] into files: merges the profile's fragments into a scratch
//! directory, builds the schema model, and writes scripts or metadata
//! reports into the output directory.

pub mod config;
pub mod job;
pub mod pipeline;

pub use config::Settings;
pub use job::{Action, Job, ReportFormat, ReportPreset};
pub use pipeline::{Pipeline, PipelineError};
