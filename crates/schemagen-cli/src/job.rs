//! The unit of work: one profile rendered for one dialect.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use schemagen_core::{Dialect, Profile, ScriptAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
  /// Create and drop scripts.
  Script,
  /// Table/column description.
  Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
  Markdown,
  Json,
}

impl ReportFormat {
  pub fn extension(self) -> &'static str {
    match self {
      Self::Markdown => "md",
      Self::Json => "json",
    }
  }
}

/// Profiles offered as ready-made metadata reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportPreset {
  Simple,
  Default,
  Wv,
  FullWithoutFeature,
}

impl ReportPreset {
  pub fn profile(self) -> Profile {
    match self {
      Self::Simple => Profile::Simple,
      Self::Default => Profile::Default,
      Self::Wv => Profile::Wv,
      Self::FullWithoutFeature => Profile::FullWithoutFeature,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
  pub profile: Profile,
  pub dialect: Dialect,
  pub action:  Action,
  pub schema:  Option<String>,
  pub format:  ReportFormat,
}

impl Job {
  pub fn script(profile: Profile, dialect: Dialect, schema: Option<String>) -> Self {
    Self {
      profile,
      dialect,
      action: Action::Script,
      schema,
      format: ReportFormat::Markdown,
    }
  }

  /// The markdown report of a preset, typed for PostGIS.
  pub fn report(preset: ReportPreset) -> Self {
    Self {
      profile: preset.profile(),
      dialect: Dialect::Postgis,
      action:  Action::Metadata,
      schema:  None,
      format:  ReportFormat::Markdown,
    }
  }

  /// Scripts for every dialect and every profile. Without an explicit
  /// schema each dialect uses its default one.
  pub fn all(schema: Option<&str>) -> Vec<Self> {
    Dialect::ALL
      .iter()
      .flat_map(|&dialect| {
        let schema = schema.or(dialect.default_schema()).map(str::to_string);
        Profile::ALL
          .iter()
          .map(move |&profile| Self::script(profile, dialect, schema.clone()))
      })
      .collect()
  }

  pub fn script_path(&self, output_dir: &Path, action: ScriptAction) -> PathBuf {
    output_dir.join(format!(
      "{}_{}_{}.sql",
      self.dialect.label(),
      self.profile.label(),
      action.label()
    ))
  }

  pub fn metadata_path(&self, output_dir: &Path) -> PathBuf {
    output_dir.join(format!(
      "{}TableMetadata.{}",
      self.profile.name(),
      self.format.extension()
    ))
  }

  /// Every file this job writes.
  pub fn outputs(&self, output_dir: &Path) -> Vec<PathBuf> {
    match self.action {
      Action::Script => vec![
        self.script_path(output_dir, ScriptAction::Create),
        self.script_path(output_dir, ScriptAction::Drop),
      ],
      Action::Metadata => vec![self.metadata_path(output_dir)],
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn script_file_names() {
    let job = Job::script(Profile::FullWithoutFeature, Dialect::Postgis, None);
    let out = Path::new("target");
    assert_eq!(job.outputs(out), [
      PathBuf::from("target/postgis_full-without-feature_create.sql"),
      PathBuf::from("target/postgis_full-without-feature_drop.sql"),
    ]);
  }

  #[test]
  fn report_file_names() {
    let mut job = Job::report(ReportPreset::Wv);
    assert_eq!(job.dialect, Dialect::Postgis);
    assert_eq!(
      job.metadata_path(Path::new("out")),
      PathBuf::from("out/WVTableMetadata.md")
    );
    job.format = ReportFormat::Json;
    assert_eq!(job.outputs(Path::new("out")), [PathBuf::from(
      "out/WVTableMetadata.json"
    )]);
  }

  #[test]
  fn all_covers_every_combination() {
    let jobs = Job::all(None);
    assert_eq!(jobs.len(), Dialect::ALL.len() * Profile::ALL.len());
    assert!(jobs.iter().all(|j| j.action == Action::Script));

    let postgis = jobs.iter().find(|j| j.dialect == Dialect::Postgis).unwrap();
    assert_eq!(postgis.schema.as_deref(), Some("public"));
    let oracle = jobs.iter().find(|j| j.dialect == Dialect::Oracle).unwrap();
    assert_eq!(oracle.schema, None);

    let explicit = Job::all(Some("sos"));
    assert!(explicit.iter().all(|j| j.schema.as_deref() == Some("sos")));
  }
}
