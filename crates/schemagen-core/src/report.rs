//! Markdown rendering of extracted table metadata.
//!
//! Output depends on nothing but the input map and the dialect label, so the
//! same metadata always renders to the same bytes.

use std::collections::HashSet;

use crate::metadata::{TableMap, TableMetadata};

const PLACEHOLDER: &str = "-";
const TITLE: &str = "Database table/column description";
const TOC_HEADING: &str = "Tables";

/// Render the whole document.
pub fn render(tables: &TableMap, dialect_label: &str) -> String {
  let mut anchors = Anchors::default();
  anchors.claim(TITLE);
  let toc_anchor = anchors.claim(TOC_HEADING);
  let sections: Vec<(&TableMetadata, String)> = tables
    .values()
    .map(|table| (table, anchors.claim(&table.name)))
    .collect();

  let mut out = String::new();
  out.push_str(&format!("# {TITLE}\n\n"));
  out.push_str("This page describes the tables and columns in the database.\n");
  out.push_str(&format!(
    "The *SQL type* column in the tables is generated for dialect: \
     *{dialect_label}*\n\n"
  ));

  out.push_str(&format!("## {TOC_HEADING}\n\n"));
  for (table, slug) in &sections {
    out.push_str(&format!("- [{}](#{slug})\n", table.name));
  }

  for (table, _) in &sections {
    out.push('\n');
    render_table(&mut out, table, &toc_anchor);
  }
  out
}

fn render_table(out: &mut String, table: &TableMetadata, toc_anchor: &str) {
  out.push_str(&format!("### {}\n\n", table.name));
  out.push_str(&format!(
    "**Description**: {}\n\n",
    cell(table.comment.as_deref())
  ));
  out.push_str("| column | comment | NOT-NULL | default | SQL type | source type |\n");
  out.push_str("| --- | --- | --- | --- | --- | --- |\n");
  for column in &table.columns {
    out.push_str(&format!(
      "| {} | {} | {} | {} | {} | {} |\n",
      cell(Some(column.name.as_str())),
      cell(column.comment.as_deref()),
      cell(column.not_null.as_deref()),
      cell(column.default_value.as_deref()),
      cell(column.sql_type.as_deref()),
      cell(column.type_name.as_deref()),
    ));
  }
  out.push_str(&format!("\n[top](#{toc_anchor})\n"));
}

/// Heading anchors in document order. A slug already in use gets the first
/// free `-N` suffix.
#[derive(Debug, Default)]
struct Anchors {
  taken: HashSet<String>,
}

impl Anchors {
  fn claim(&mut self, heading: &str) -> String {
    let base = anchor(heading);
    let mut slug = base.clone();
    let mut n = 0;
    while !self.taken.insert(slug.clone()) {
      n += 1;
      slug = format!("{base}-{n}");
    }
    slug
  }
}

/// A table cell: placeholder when empty, pipes escaped, line breaks folded.
fn cell(value: Option<&str>) -> String {
  match value.map(str::trim) {
    Some(v) if !v.is_empty() => v
      .split_whitespace()
      .collect::<Vec<_>>()
      .join(" ")
      .replace('|', "\\|"),
    _ => PLACEHOLDER.to_string(),
  }
}

/// GitHub-style heading anchor.
pub fn anchor(heading: &str) -> String {
  heading
    .trim()
    .to_lowercase()
    .chars()
    .filter_map(|c| match c {
      ' ' => Some('-'),
      c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c),
      _ => None,
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::metadata::{ColumnMetadata, TableMetadata};

  fn table(name: &str, comment: Option<&str>) -> TableMetadata {
    TableMetadata::new(name, comment)
  }

  fn sample() -> TableMap {
    let mut map = TableMap::new();
    let mut dataset = table("dataset", Some("Storage of the datasets"));
    let mut id = ColumnMetadata::new("dataset_id");
    id.sql_type = Some("int8".into());
    id.type_name = Some("long".into());
    id.not_null = Some("true".into());
    id.comment = Some("PK | surrogate".into());
    dataset.columns.push(id);
    let mut name = ColumnMetadata::new("name");
    name.sql_type = Some("varchar(255)".into());
    name.type_name = Some("string".into());
    name.not_null = Some("false".into());
    name.default_value = Some("'n/a'".into());
    dataset.columns.push(name);

    map.insert("phenomenon".into(), table("phenomenon", None));
    map.insert("dataset".into(), dataset);
    map.insert("Category".into(), table("Category", None));
    map
  }

  #[test]
  fn toc_and_sections_follow_sorted_order() {
    let doc = render(&sample(), "PostgisPG95Dialect");
    let toc: Vec<_> = doc
      .lines()
      .filter(|l| l.starts_with("- ["))
      .collect();
    assert_eq!(toc, [
      "- [Category](#category)",
      "- [dataset](#dataset)",
      "- [phenomenon](#phenomenon)",
    ]);
    let sections: Vec<_> = doc
      .lines()
      .filter_map(|l| l.strip_prefix("### "))
      .collect();
    assert_eq!(sections, ["Category", "dataset", "phenomenon"]);
  }

  #[test]
  fn intro_names_the_dialect() {
    let doc = render(&sample(), "GeoDBDialect");
    assert!(doc.starts_with("# Database table/column description\n"));
    assert!(doc.contains("generated for dialect: *GeoDBDialect*"));
  }

  #[test]
  fn rows_render_with_placeholders_and_escapes() {
    let doc = render(&sample(), "PostgisPG95Dialect");
    assert!(doc.contains("**Description**: Storage of the datasets"));
    assert!(doc.contains(
      "| dataset_id | PK \\| surrogate | true | - | int8 | long |"
    ));
    assert!(doc.contains("| name | - | false | 'n/a' | varchar(255) | string |"));
    assert!(doc.contains("**Description**: -"));
  }

  #[test]
  fn every_section_links_back() {
    let doc = render(&sample(), "x");
    assert_eq!(doc.matches("[top](#tables)").count(), 3);
  }

  #[test]
  fn rendering_is_deterministic() {
    assert_eq!(render(&sample(), "x"), render(&sample(), "x"));
  }

  #[test]
  fn colliding_slugs_get_suffixes() {
    let mut map = TableMap::new();
    for name in ["Category", "category", "tables"] {
      map.insert(name.into(), table(name, None));
    }
    let doc = render(&map, "x");
    let toc: Vec<_> = doc
      .lines()
      .filter(|l| l.starts_with("- ["))
      .collect();
    assert_eq!(toc, [
      "- [Category](#category)",
      "- [category](#category-1)",
      "- [tables](#tables-1)",
    ]);
    assert_eq!(doc.matches("[top](#tables)").count(), 3);
  }

  #[test]
  fn anchors_are_slugged() {
    assert_eq!(anchor("Tables"), "tables");
    assert_eq!(anchor("series_parameter"), "series_parameter");
    assert_eq!(anchor("a.b c"), "ab-c");
  }
}
