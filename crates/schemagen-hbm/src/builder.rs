//! [`HbmBuilder`], the hbm implementation of [`SchemaBuilder`].

use std::path::Path;

use schemagen_core::{
  Dialect, SchemaBuilder, ScriptAction, model::SchemaModel,
};

use crate::{Error, Result, compile, emit};

/// Compiles a directory of merged hbm files. Holds no state; one value can
/// serve any number of jobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct HbmBuilder;

impl SchemaBuilder for HbmBuilder {
  type Error = Error;

  fn build_model(
    &self,
    merged_dir: &Path,
    dialect: Dialect,
    schema: Option<&str>,
  ) -> Result<SchemaModel> {
    compile::build_model(merged_dir, dialect, schema)
  }

  fn emit_script(
    &self,
    model: &SchemaModel,
    action: ScriptAction,
  ) -> Result<Vec<String>> {
    match action {
      ScriptAction::Create => emit::create(model),
      ScriptAction::Drop => emit::drop(model),
    }
  }
}
