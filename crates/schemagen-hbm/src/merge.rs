//! Structural merge of mapping fragments.
//!
//! All fragments sharing a base file name are folded into one document, in
//! topic order. A later fragment refines an earlier one: matched elements take
//! its attributes and text, unmatched elements are appended. Later topics win.

use std::{
  collections::HashMap,
  fs::{self, OpenOptions},
  io::Write as _,
  path::{Path, PathBuf},
};

use crate::{
  error::{Error, Result},
  fragment::{self, FragmentGroup},
  xml::{self, Document, Element, Node},
};

/// Attributes that give an element its identity among its siblings, in
/// priority order.
pub const DEFAULT_KEY_ATTRIBUTES: [&str; 2] = ["id", "name"];

/// Per-element directive controlling how a later element is combined.
const COMBINE_SELF: &str = "combine.self";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
  Merge,
  Override,
  Remove,
}

impl Directive {
  fn of(element: &Element) -> Self {
    match element.attr(COMBINE_SELF) {
      Some("override") => Self::Override,
      Some("remove") => Self::Remove,
      _ => Self::Merge,
    }
  }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
  Written(PathBuf),
  /// The destination file already existed and was left alone.
  Skipped(PathBuf),
}

/// What a merge stage did. Failures do not stop the stage; they are all
/// collected here.
#[derive(Debug, Default)]
pub struct MergeReport {
  pub written:  Vec<PathBuf>,
  pub skipped:  Vec<PathBuf>,
  pub failures: Vec<Error>,
}

impl MergeReport {
  pub fn is_success(&self) -> bool { self.failures.is_empty() }

  /// Fail with every collected error if any group failed.
  pub fn into_result(self) -> Result<Self> {
    if self.failures.is_empty() {
      Ok(self)
    } else {
      Err(Error::MergeFailed(self.failures))
    }
  }
}

// ─── Merger ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Merger {
  key_attributes: Vec<String>,
}

impl Default for Merger {
  fn default() -> Self { Self::new(DEFAULT_KEY_ATTRIBUTES) }
}

impl Merger {
  pub fn new<I, S>(key_attributes: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      key_attributes: key_attributes.into_iter().map(Into::into).collect(),
    }
  }

  /// Merge every fragment of `topics` under `mapping_root` into
  /// `destination`, one output file per base file name.
  pub fn merge_topics(
    &self,
    mapping_root: &Path,
    topics: &[&str],
    destination: &Path,
  ) -> MergeReport {
    tracing::info!(
      root = %mapping_root.display(),
      destination = %destination.display(),
      topics = topics.len(),
      "merging mapping fragments"
    );

    let mut report = MergeReport::default();
    if let Err(e) = fs::create_dir_all(destination) {
      report.failures.push(Error::io(destination, e));
      return report;
    }

    let (groups, failures) = fragment::group(mapping_root, topics);
    for failure in failures {
      tracing::warn!(error = %failure, "cannot read topic");
      report.failures.push(failure);
    }

    for group in &groups {
      match self.merge_group(group, destination) {
        Ok(GroupOutcome::Written(path)) => {
          tracing::debug!(
            file = %group.file_name,
            fragments = group.fragments.len(),
            "merged"
          );
          report.written.push(path);
        }
        Ok(GroupOutcome::Skipped(path)) => report.skipped.push(path),
        Err(e) => {
          tracing::warn!(file = %group.file_name, error = %e, "merge failed");
          report.failures.push(e);
        }
      }
    }

    tracing::info!(
      written = report.written.len(),
      skipped = report.skipped.len(),
      failed = report.failures.len(),
      "merge finished"
    );
    report
  }

  /// Merge one group into `destination/<file name>`.
  ///
  /// An existing destination file is never touched: the group is skipped
  /// before any fragment is read.
  pub fn merge_group(
    &self,
    group: &FragmentGroup,
    destination: &Path,
  ) -> Result<GroupOutcome> {
    let target = destination.join(&group.file_name);
    if target.exists() {
      tracing::warn!(path = %target.display(), "merged file exists, skipping");
      return Ok(GroupOutcome::Skipped(target));
    }

    let mut fragments = group.fragments.iter();
    let Some(first) = fragments.next() else {
      return Err(Error::parse(&target, "no fragments to merge"));
    };
    let mut composite = read(&first.path)?;

    for fragment in fragments {
      let overlay = read(&fragment.path)?;
      if overlay.root.name != composite.root.name {
        return Err(Error::parse(
          &fragment.path,
          format!(
            "root element <{}> does not match <{}>",
            overlay.root.name, composite.root.name
          ),
        ));
      }
      if composite.doctype.is_none() {
        composite.doctype = overlay.doctype;
      }
      self.combine(&mut composite.root, overlay.root);
    }
    strip_directives(&mut composite.root);

    let bytes = xml::write(&composite).map_err(|m| Error::parse(&target, m))?;
    let mut file = OpenOptions::new()
      .write(true)
      .create_new(true)
      .open(&target)
      .map_err(|e| Error::io(&target, e))?;
    file.write_all(&bytes).map_err(|e| Error::io(&target, e))?;

    Ok(GroupOutcome::Written(target))
  }

  /// Fold `overlay` into `base`. Directive attributes are left in place;
  /// [`strip_directives`] removes them once the whole group is combined.
  pub fn combine(&self, base: &mut Element, overlay: Element) {
    for (key, value) in &overlay.attributes {
      if key != COMBINE_SELF {
        base.set_attr(key, value);
      }
    }

    if overlay.has_text() {
      let elements = std::mem::take(&mut base.children)
        .into_iter()
        .filter(|n| matches!(n, Node::Element(_)));
      base.children = overlay
        .children
        .iter()
        .filter(|n| !matches!(n, Node::Element(_)))
        .cloned()
        .chain(elements)
        .collect();
    }

    let targets = self.match_children(base, &overlay);
    let mut removed = vec![false; base.children.len()];
    let mut appended = Vec::new();

    let overlay_elements = overlay.children.into_iter().filter_map(|n| match n {
      Node::Element(e) => Some(e),
      _ => None,
    });
    for (child, target) in overlay_elements.zip(targets) {
      match (Directive::of(&child), target) {
        (Directive::Remove, Some(idx)) => removed[idx] = true,
        (Directive::Remove, None) => {}
        (Directive::Override, Some(idx)) => {
          base.children[idx] = Node::Element(child);
        }
        (Directive::Merge, Some(idx)) => {
          if let Node::Element(existing) = &mut base.children[idx] {
            self.combine(existing, child);
          }
        }
        (_, None) => appended.push(Node::Element(child)),
      }
    }

    if removed.iter().any(|r| *r) {
      let children = std::mem::take(&mut base.children);
      base.children = children
        .into_iter()
        .zip(removed)
        .filter_map(|(node, gone)| (!gone).then_some(node))
        .collect();
    }
    base.children.extend(appended);
  }

  /// For every element child of `overlay`, the index of its counterpart among
  /// `base.children`.
  fn match_children(
    &self,
    base: &Element,
    overlay: &Element,
  ) -> Vec<Option<usize>> {
    let mut positional: HashMap<&str, usize> = HashMap::new();

    overlay
      .elements()
      .map(|child| {
        if self.is_keyed(child) {
          return base.children.iter().position(|n| {
            matches!(n, Node::Element(e) if e.name == child.name && self.same_identity(e, child))
          });
        }
        let nth = positional.entry(child.name.as_str()).or_insert(0);
        let found = base
          .children
          .iter()
          .enumerate()
          .filter_map(|(idx, n)| match n {
            Node::Element(e) if e.name == child.name && !self.is_keyed(e) => Some(idx),
            _ => None,
          })
          .nth(*nth);
        *nth += 1;
        found
      })
      .collect()
  }

  /// Two keyed elements are the same node when the first key attribute
  /// carried by both has equal values.
  fn same_identity(&self, a: &Element, b: &Element) -> bool {
    self
      .key_attributes
      .iter()
      .find_map(|key| Some((a.attr(key)?, b.attr(key)?)))
      .is_some_and(|(x, y)| x == y)
  }

  fn is_keyed(&self, element: &Element) -> bool {
    self.key_attributes.iter().any(|key| element.attr(key).is_some())
  }
}

fn read(path: &Path) -> Result<Document> {
  let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
  xml::parse(&bytes).map_err(|message| Error::parse(path, message))
}

fn strip_directives(element: &mut Element) {
  element.remove_attr(COMBINE_SELF);
  for child in &mut element.children {
    if let Node::Element(e) = child {
      strip_directives(e);
    }
  }
}
