//! Error types for `schemagen-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid profile: {0:?}")]
  InvalidProfile(String),

  #[error("invalid dialect: {0:?}")]
  InvalidDialect(String),

  /// The schema model references something it does not contain. Points at a
  /// defect in fragment composition or in the builder, never at user input.
  #[error("model inconsistency: {0}")]
  ModelInconsistency(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
