//! `schemagen`: database schema scripts and table documentation from
//! topic-organised hbm mapping fragments.
//!
//! # Usage
//!
//! ```text
//! schemagen all --schema public
//! schemagen run --dialect postgis --profile default --action metadata
//! schemagen report full-without-feature
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use schemagen_cli::{Action, Job, Pipeline, ReportFormat, ReportPreset, Settings};
use schemagen_core::{Dialect, Profile};
use schemagen_hbm::HbmBuilder;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "schemagen", version, about = "Generate database schema scripts and metadata from hbm fragments")]
struct Cli {
  /// Path to a TOML settings file (default: schemagen.toml, if present).
  #[arg(short, long, value_name = "FILE", global = true)]
  config: Option<PathBuf>,

  /// Root directory holding one sub-directory per topic.
  #[arg(long, value_name = "DIR", global = true)]
  mapping_dir: Option<PathBuf>,

  /// Scratch directory for merged fragments.
  #[arg(long, value_name = "DIR", global = true)]
  work_dir: Option<PathBuf>,

  /// Directory receiving scripts and reports.
  #[arg(long, value_name = "DIR", global = true)]
  output_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create and drop scripts for every dialect and every profile.
  All {
    /// Schema qualifying table names; defaults to each dialect's own.
    #[arg(long)]
    schema: Option<String>,
  },
  /// A single job.
  Run {
    /// Target dialect (postgis, oracle, geodb, mysql, sqlserver).
    #[arg(long)]
    dialect: Dialect,

    /// Profile (simple, default, ereporting, full-without-feature, full, wv).
    #[arg(long)]
    profile: Profile,

    #[arg(long, value_enum, default_value_t = Action::Script)]
    action: Action,

    /// Schema qualifying table names.
    #[arg(long)]
    schema: Option<String>,

    /// Output format of metadata reports.
    #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
    format: ReportFormat,
  },
  /// The markdown metadata report of a preset, typed for PostGIS.
  Report {
    #[arg(value_enum)]
    preset: ReportPreset,
  },
}

// ─── Entry point ─────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  // CLI flags override the settings file, which overrides defaults.
  let mut settings = Settings::load(cli.config.as_deref())
    .context("failed to load settings")?;
  if let Some(dir) = cli.mapping_dir {
    settings.mapping_dir = dir;
  }
  if let Some(dir) = cli.work_dir {
    settings.work_dir = dir;
  }
  if let Some(dir) = cli.output_dir {
    settings.output_dir = dir;
  }

  let jobs = match cli.command {
    Command::All { schema } => Job::all(schema.as_deref()),
    Command::Run {
      dialect,
      profile,
      action,
      schema,
      format,
    } => vec![Job {
      profile,
      dialect,
      action,
      schema,
      format,
    }],
    Command::Report { preset } => vec![Job::report(preset)],
  };

  let pipeline = Pipeline::new(HbmBuilder, settings);
  let written = pipeline.run_all(&jobs).context("generation failed")?;
  for path in written {
    println!("{}", path.display());
  }
  Ok(())
}
