//! Profiles ("concepts"): named, reproducible schema variants.
//!
//! A profile resolves to an ordered list of topics. The order is part of the
//! contract: topics later in the list override fragments of earlier ones.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ─── Topic lists ─────────────────────────────────────────────────────────────

const SIMPLE: &[&str] = &["core", "dataset", "datasetType"];

const DEFAULT: &[&str] =
  &["core", "dataset", "datasetType", "expandedDataset", "datatypes"];

const EREPORTING: &[&str] = &["ereporting"];

const WV: &[&str] = &["core", "dataset", "referencedDataset", "translations"];

const FULL_WITHOUT_FEATURE: &[&str] = &[
  "core",
  "dataset",
  "datatypes",
  "expandedDataset",
  "hierarchies",
  "hierarchiesPhenomenon",
  "metadata",
  "parameter",
  "procedureHistory",
  "referencedDataset",
  "relations",
  "transactional",
  "translations",
];

const FULL: &[&str] = &[
  "core",
  "dataset",
  "datatypes",
  "expandedDataset",
  "hierarchies",
  "hierarchiesPhenomenon",
  "metadata",
  "parameter",
  "procedureHistory",
  "referencedDataset",
  "relations",
  "transactional",
  "translations",
  "feature",
];

// ─── Profile ─────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
  Simple,
  Default,
  Ereporting,
  FullWithoutFeature,
  Full,
  Wv,
}

impl Profile {
  pub const ALL: [Profile; 6] = [
    Profile::Simple,
    Profile::Default,
    Profile::Ereporting,
    Profile::FullWithoutFeature,
    Profile::Full,
    Profile::Wv,
  ];

  /// The ordered topic list this profile merges.
  pub fn topics(self) -> &'static [&'static str] {
    match self {
      Self::Simple => SIMPLE,
      Self::Default => DEFAULT,
      Self::Ereporting => EREPORTING,
      Self::FullWithoutFeature => FULL_WITHOUT_FEATURE,
      Self::Full => FULL,
      Self::Wv => WV,
    }
  }

  /// Kebab-case label; used on the command line and in script file names.
  pub fn label(self) -> &'static str {
    match self {
      Self::Simple => "simple",
      Self::Default => "default",
      Self::Ereporting => "ereporting",
      Self::FullWithoutFeature => "full-without-feature",
      Self::Full => "full",
      Self::Wv => "wv",
    }
  }

  /// Display name; used for the metadata document file name.
  pub fn name(self) -> &'static str {
    match self {
      Self::Simple => "Simple",
      Self::Default => "Default",
      Self::Ereporting => "EReporting",
      Self::FullWithoutFeature => "FullWithoutFeature",
      Self::Full => "Full",
      Self::Wv => "WV",
    }
  }
}

/// Resolve a profile label straight to its ordered topic list.
pub fn resolve(label: &str) -> Result<&'static [&'static str], Error> {
  Ok(label.parse::<Profile>()?.topics())
}

impl fmt::Display for Profile {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl FromStr for Profile {
  type Err = Error;

  /// Accepts the label in any case, with `-` or `_` separators or none.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized: String = s
      .trim()
      .chars()
      .filter(|c| *c != '-' && *c != '_')
      .collect::<String>()
      .to_ascii_lowercase();
    match normalized.as_str() {
      "simple" => Ok(Self::Simple),
      "default" => Ok(Self::Default),
      "ereporting" => Ok(Self::Ereporting),
      "fullwithoutfeature" => Ok(Self::FullWithoutFeature),
      "full" => Ok(Self::Full),
      "wv" => Ok(Self::Wv),
      _ => Err(Error::InvalidProfile(s.to_string())),
    }
  }
}
