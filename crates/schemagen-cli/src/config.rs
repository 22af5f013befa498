//! Runtime settings, read from an optional TOML file and `SCHEMAGEN_*`
//! environment variables.

use std::path::{Path, PathBuf};

use schemagen_core::dedup::DEFAULT_KEY_HINT;
use schemagen_hbm::merge::DEFAULT_KEY_ATTRIBUTES;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "schemagen.toml";
const ENV_PREFIX: &str = "SCHEMAGEN";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Root of the topic directories.
  pub mapping_dir:         PathBuf,
  /// Scratch space; merged fragments land in `<work_dir>/<profile>`.
  pub work_dir:            PathBuf,
  pub output_dir:          PathBuf,
  /// Relation role whose duplicated constraint is removed from create
  /// scripts.
  pub dedup_hint:          String,
  pub merge_keys:          Vec<String>,
  /// Append a creation-date line to markdown reports.
  pub stamp_creation_date: bool,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      mapping_dir:         PathBuf::from("hbm"),
      work_dir:            PathBuf::from("target/test"),
      output_dir:          PathBuf::from("target"),
      dedup_hint:          DEFAULT_KEY_HINT.to_string(),
      merge_keys:          DEFAULT_KEY_ATTRIBUTES.map(String::from).to_vec(),
      stamp_creation_date: true,
    }
  }
}

impl Settings {
  /// Load settings. An explicitly named file must exist; the default
  /// `schemagen.toml` is optional.
  pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
    let source = match file {
      Some(path) => config::File::from(path).required(true),
      None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };
    config::Config::builder()
      .add_source(source)
      .add_source(
        config::Environment::with_prefix(ENV_PREFIX)
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("merge_keys"),
      )
      .build()?
      .try_deserialize()
  }
}
