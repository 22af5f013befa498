//! The fragment store: topic directories full of mapping fragments.
//!
//! Layout on disk is `<mapping root>/<topic>/**/<fragment file>`. Fragments
//! with the same base file name in different topics describe the same logical
//! entity and are merged together.

use std::{
  collections::HashMap,
  fs,
  io,
  path::{Path, PathBuf},
};

use crate::error::{Error, Result};

/// One fragment file and the topic it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
  pub topic: String,
  pub path:  PathBuf,
}

/// All fragments sharing a base file name, in topic order and then traversal
/// order within a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentGroup {
  pub file_name: String,
  pub fragments: Vec<Fragment>,
}

/// List every file below `dir`, recursively. Entries of a directory are
/// visited in file-name order so the result does not depend on the platform.
pub fn enumerate(dir: &Path) -> Result<Vec<PathBuf>> {
  if !dir.is_dir() {
    return Err(Error::io(
      dir,
      io::Error::new(io::ErrorKind::NotFound, "topic directory not found"),
    ));
  }
  let mut files = Vec::new();
  collect(dir, &mut files)?;
  Ok(files)
}

fn collect(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
  let mut entries = fs::read_dir(dir)
    .map_err(|e| Error::io(dir, e))?
    .collect::<io::Result<Vec<_>>>()
    .map_err(|e| Error::io(dir, e))?;
  entries.sort_by_key(|entry| entry.file_name());

  for entry in entries {
    let path = entry.path();
    let file_type = entry.file_type().map_err(|e| Error::io(&path, e))?;
    if file_type.is_dir() {
      collect(&path, files)?;
    } else if file_type.is_file() {
      files.push(path);
    }
  }
  Ok(())
}

/// Group the fragments of `topics` (in the given order) by base file name.
///
/// Topics that cannot be enumerated are reported in the second element; the
/// remaining topics are still grouped.
pub fn group(
  mapping_root: &Path,
  topics: &[&str],
) -> (Vec<FragmentGroup>, Vec<Error>) {
  let mut groups: Vec<FragmentGroup> = Vec::new();
  let mut index: HashMap<String, usize> = HashMap::new();
  let mut failures = Vec::new();

  for topic in topics {
    let files = match enumerate(&mapping_root.join(topic)) {
      Ok(files) => files,
      Err(e) => {
        failures.push(e);
        continue;
      }
    };
    tracing::debug!(topic, fragments = files.len(), "enumerated topic");

    for path in files {
      let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned())
      else {
        continue;
      };
      let idx = *index.entry(file_name.clone()).or_insert_with(|| {
        groups.push(FragmentGroup {
          file_name,
          fragments: Vec::new(),
        });
        groups.len() - 1
      });
      groups[idx].fragments.push(Fragment {
        topic: topic.to_string(),
        path,
      });
    }
  }

  (groups, failures)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "<hibernate-mapping/>").unwrap();
  }

  #[test]
  fn enumerates_recursively_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("core/b.hbm.xml"));
    touch(&root.join("core/a.hbm.xml"));
    touch(&root.join("core/nested/c.hbm.xml"));

    let files = enumerate(&root.join("core")).unwrap();
    let names: Vec<_> = files
      .iter()
      .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
      .collect();
    assert_eq!(names, [
      "core/a.hbm.xml",
      "core/b.hbm.xml",
      "core/nested/c.hbm.xml"
    ]);
  }

  #[test]
  fn missing_topic_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = enumerate(&dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
  }

  #[test]
  fn groups_follow_topic_order() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("core/dataset.hbm.xml"));
    touch(&root.join("core/phenomenon.hbm.xml"));
    touch(&root.join("extra/dataset.hbm.xml"));
    touch(&root.join("extra/tag.hbm.xml"));

    let (groups, failures) = group(root, &["extra", "core"]);
    assert!(failures.is_empty());

    let names: Vec<_> = groups.iter().map(|g| g.file_name.as_str()).collect();
    assert_eq!(names, ["dataset.hbm.xml", "tag.hbm.xml", "phenomenon.hbm.xml"]);

    let topics: Vec<_> =
      groups[0].fragments.iter().map(|f| f.topic.as_str()).collect();
    assert_eq!(topics, ["extra", "core"]);
  }

  #[test]
  fn missing_topic_does_not_stop_grouping() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("core/dataset.hbm.xml"));

    let (groups, failures) = group(dir.path(), &["core", "absent"]);
    assert_eq!(groups.len(), 1);
    assert_eq!(failures.len(), 1);
  }
}
