//! The `SchemaBuilder` trait.
//!
//! Implemented by mapping compilers (e.g. `schemagen-hbm`). The generator
//! only ever talks to this abstraction: it hands over a directory of merged
//! fragments and gets back a [`SchemaModel`], then asks for scripts.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{dialect::Dialect, model::SchemaModel};

/// Which script [`SchemaBuilder::emit_script`] renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptAction {
  Create,
  Drop,
}

impl ScriptAction {
  pub fn label(self) -> &'static str {
    match self {
      Self::Create => "create",
      Self::Drop => "drop",
    }
  }
}

pub trait SchemaBuilder {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Compile every merged fragment in `merged_dir` into a model for
  /// `dialect`. `schema` qualifies table names in emitted scripts.
  fn build_model(
    &self,
    merged_dir: &Path,
    dialect: Dialect,
    schema: Option<&str>,
  ) -> Result<SchemaModel, Self::Error>;

  /// Render the statements (without trailing delimiters) that create or drop
  /// everything in `model`.
  fn emit_script(
    &self,
    model: &SchemaModel,
    action: ScriptAction,
  ) -> Result<Vec<String>, Self::Error>;
}
