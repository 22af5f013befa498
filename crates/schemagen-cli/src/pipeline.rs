//! [`Pipeline`]: merge, build, then write scripts or metadata.

use std::{
  fs, io,
  path::{Path, PathBuf},
};

use schemagen_core::{
  Profile, SchemaBuilder, ScriptAction, dedup, metadata, model::SchemaModel,
  report,
};
use schemagen_hbm::Merger;
use thiserror::Error;

use crate::{
  config::Settings,
  job::{Action, Job, ReportFormat},
};

const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("fragment merge failed: {0}")]
  Merge(#[from] schemagen_hbm::Error),
  #[error("schema builder failed: {0}")]
  Builder(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error(transparent)]
  Model(#[from] schemagen_core::Error),
  #[error("cannot write {path}: {source}")]
  Output {
    path:   PathBuf,
    #[source]
    source: io::Error,
  },
  #[error("json encoding failed: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

fn output(path: &Path) -> impl FnOnce(io::Error) -> PipelineError + '_ {
  move |source| PipelineError::Output {
    path: path.to_path_buf(),
    source,
  }
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

pub struct Pipeline<B> {
  builder:  B,
  merger:   Merger,
  settings: Settings,
}

impl<B: SchemaBuilder> Pipeline<B> {
  pub fn new(builder: B, settings: Settings) -> Self {
    let merger = Merger::new(settings.merge_keys.iter().cloned());
    Self {
      builder,
      merger,
      settings,
    }
  }

  /// Run one job and return the files it wrote.
  ///
  /// Outputs of an earlier run are deleted first, so a failed job leaves
  /// nothing that looks like a result behind.
  pub fn run(&self, job: &Job) -> Result<Vec<PathBuf>> {
    tracing::info!(
      profile = %job.profile,
      dialect = %job.dialect,
      action = ?job.action,
      "starting job"
    );
    for path in job.outputs(&self.settings.output_dir) {
      remove_stale(&path)?;
    }

    let merged = self.merge(job.profile)?;
    let model = self
      .builder
      .build_model(&merged, job.dialect, job.schema.as_deref())
      .map_err(|e| PipelineError::Builder(Box::new(e)))?;

    let written = match job.action {
      Action::Script => self.scripts(job, &model)?,
      Action::Metadata => vec![self.metadata(job, &model)?],
    };
    for path in &written {
      tracing::info!(path = %path.display(), "wrote");
    }
    Ok(written)
  }

  /// Run jobs in order, stopping at the first failure.
  pub fn run_all(&self, jobs: &[Job]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for job in jobs {
      written.extend(self.run(job)?);
    }
    Ok(written)
  }

  /// Merge the profile's topics into its scratch directory.
  fn merge(&self, profile: Profile) -> Result<PathBuf> {
    let scratch = self.settings.work_dir.join(profile.label());
    self
      .merger
      .merge_topics(&self.settings.mapping_dir, profile.topics(), &scratch)
      .into_result()?;
    Ok(scratch)
  }

  fn scripts(&self, job: &Job, model: &SchemaModel) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(2);
    for action in [ScriptAction::Create, ScriptAction::Drop] {
      let mut lines = self
        .builder
        .emit_script(model, action)
        .map_err(|e| PipelineError::Builder(Box::new(e)))?;
      if action == ScriptAction::Create {
        lines = dedup::dedupe(&lines, &self.settings.dedup_hint);
      }
      tracing::debug!(action = action.label(), statements = lines.len(), "script");

      let path = job.script_path(&self.settings.output_dir, action);
      write_atomically(&path, script_text(&lines).as_bytes())?;
      written.push(path);
    }
    Ok(written)
  }

  fn metadata(&self, job: &Job, model: &SchemaModel) -> Result<PathBuf> {
    let tables = metadata::extract(model)?;
    tracing::debug!(tables = tables.len(), "extracted metadata");

    let body = match job.format {
      ReportFormat::Markdown => {
        let mut text = report::render(&tables, job.dialect.display_name());
        if self.settings.stamp_creation_date {
          text.push_str(&creation_date_footer());
        }
        text
      }
      ReportFormat::Json => {
        let mut text = serde_json::to_string_pretty(&tables)?;
        text.push('\n');
        text
      }
    };

    let path = job.metadata_path(&self.settings.output_dir);
    write_atomically(&path, body.as_bytes())?;
    Ok(path)
  }
}

/// Statements terminated by `;`, one per line.
fn script_text(lines: &[String]) -> String {
  lines.iter().map(|line| format!("{line};\n")).collect()
}

fn creation_date_footer() -> String {
  let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S %:z");
  format!("\n*Creation date: {now}*\n")
}

fn remove_stale(path: &Path) -> Result<()> {
  match fs::remove_file(path) {
    Ok(()) => {
      tracing::debug!(path = %path.display(), "removed previous output");
      Ok(())
    }
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(output(path)(e)),
  }
}

/// Write to a `.partial` sibling, then rename over `path`.
fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(output(parent))?;
  }
  let mut partial = path.as_os_str().to_owned();
  partial.push(PARTIAL_SUFFIX);
  let partial = PathBuf::from(partial);

  fs::write(&partial, contents).map_err(output(&partial))?;
  fs::rename(&partial, path).map_err(output(path))
}
