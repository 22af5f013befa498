//! Error types for `schemagen-hbm`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed fragment {path}: {message}")]
  FragmentParse { path: PathBuf, message: String },

  #[error("i/o error on {path}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("mapping error in {file}: {message}")]
  Mapping { file: String, message: String },

  #[error("merge finished with {} failure(s):\n{}", .0.len(), list(.0))]
  MergeFailed(Vec<Error>),
}

impl Error {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }

  pub(crate) fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
    Self::FragmentParse {
      path:    path.into(),
      message: message.to_string(),
    }
  }

  pub(crate) fn mapping(file: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Mapping {
      file:    file.into(),
      message: message.into(),
    }
  }
}

fn list(errors: &[Error]) -> String {
  errors
    .iter()
    .map(|e| format!("  - {e}"))
    .collect::<Vec<_>>()
    .join("\n")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
