//! hbm mapping support for the schema generator.
//!
//! Merges topic-organised mapping fragments into complete hbm files and
//! compiles those into a [`SchemaModel`](schemagen_core::model::SchemaModel)
//! through [`HbmBuilder`], the [`SchemaBuilder`](schemagen_core::SchemaBuilder)
//! implementation for this format.

mod builder;
mod compile;
mod emit;

pub mod error;
pub mod fragment;
pub mod merge;
pub mod xml;

pub use builder::HbmBuilder;
pub use error::{Error, Result};
pub use merge::{MergeReport, Merger};

#[cfg(test)]
mod tests;
