//! Table/column metadata extraction.
//!
//! Walks a [`SchemaModel`] and folds every description of a column (from its
//! table, from the properties and identifiers mapped onto it, from join and
//! collection tables) into one [`ColumnMetadata`] per table and column.
//!
//! The fold is governed by [`first_non_empty`]: a field keeps the first
//! non-empty value it ever sees. Later, possibly less informed, sites never
//! overwrite it.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
  dialect::Dialect,
  error::{Error, Result},
  model::{Column, SchemaModel, Table},
};

/// Sorted by table name.
pub type TableMap = BTreeMap<String, TableMetadata>;

// ─── Merge policy ────────────────────────────────────────────────────────────

/// Resolve a field: the existing value if it is non-empty, otherwise the
/// candidate if that is non-empty, otherwise nothing.
pub fn first_non_empty(
  existing: Option<String>,
  candidate: Option<&str>,
) -> Option<String> {
  match existing {
    Some(value) if !value.is_empty() => Some(value),
    _ => candidate.filter(|c| !c.is_empty()).map(str::to_string),
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnMetadata {
  pub name:          String,
  pub comment:       Option<String>,
  pub sql_type:      Option<String>,
  /// The mapping type name the column was declared with.
  pub type_name:     Option<String>,
  pub default_value: Option<String>,
  /// `"true"` or `"false"`.
  pub not_null:      Option<String>,
}

/// One site's statement about a column, before merging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFacts<'a> {
  pub comment:       Option<&'a str>,
  pub sql_type:      Option<&'a str>,
  pub type_name:     Option<&'a str>,
  pub default_value: Option<&'a str>,
  pub not_null:      Option<&'a str>,
}

impl ColumnMetadata {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }

  /// Apply the merge policy to every field independently.
  pub fn fold(&mut self, facts: ColumnFacts<'_>) {
    self.comment = first_non_empty(self.comment.take(), facts.comment);
    self.sql_type = first_non_empty(self.sql_type.take(), facts.sql_type);
    self.type_name = first_non_empty(self.type_name.take(), facts.type_name);
    self.default_value =
      first_non_empty(self.default_value.take(), facts.default_value);
    self.not_null = first_non_empty(self.not_null.take(), facts.not_null);
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableMetadata {
  pub name:    String,
  pub comment: Option<String>,
  /// In first-discovery order.
  pub columns: Vec<ColumnMetadata>,
}

impl TableMetadata {
  pub fn new(name: impl Into<String>, comment: Option<&str>) -> Self {
    Self {
      name:    name.into(),
      comment: first_non_empty(None, comment),
      columns: Vec::new(),
    }
  }

  pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
    self.columns.iter().find(|c| c.name == name)
  }

  /// The record for `name`, created on first sight.
  pub fn column_mut(&mut self, name: &str) -> &mut ColumnMetadata {
    let idx = match self.columns.iter().position(|c| c.name == name) {
      Some(idx) => idx,
      None => {
        self.columns.push(ColumnMetadata::new(name));
        self.columns.len() - 1
      }
    };
    &mut self.columns[idx]
  }
}

// ─── Extraction ──────────────────────────────────────────────────────────────

/// Extract the per-table, per-column view of `model`.
///
/// Fails with [`Error::ModelInconsistency`] when an entity, join or collection
/// names a table the model does not contain.
pub fn extract(model: &SchemaModel) -> Result<TableMap> {
  let mut map = TableMap::new();
  let dialect = model.dialect;

  for entity in &model.entities {
    let table = resolve(model, &entity.table, &entity.name)?;
    fold_table(&mut map, table, dialect);

    for join in &entity.joins {
      let join_table = resolve(model, &join.table, &entity.name)?;
      fold_table(&mut map, join_table, dialect);
      for property in &join.properties {
        if let Some(name) = &property.collection_table {
          let collection = resolve(model, name, &entity.name)?;
          fold_table(&mut map, collection, dialect);
        }
        let tm = table_entry(&mut map, join_table);
        fold_columns(tm, &property.columns, dialect);
      }
    }

    for property in &entity.properties {
      if let Some(name) = &property.collection_table {
        let collection = resolve(model, name, &entity.name)?;
        fold_table(&mut map, collection, dialect);
      }
      let tm = table_entry(&mut map, table);
      fold_columns(tm, &property.columns, dialect);
    }

    let tm = table_entry(&mut map, table);
    fold_columns(tm, &entity.identifier, dialect);
  }

  tracing::debug!(tables = map.len(), "extracted table metadata");
  Ok(map)
}

fn resolve<'m>(
  model: &'m SchemaModel,
  table: &str,
  entity: &str,
) -> Result<&'m Table> {
  model.table(table).ok_or_else(|| {
    Error::ModelInconsistency(format!(
      "entity {entity} references unknown table {table}"
    ))
  })
}

fn table_entry<'a>(map: &'a mut TableMap, table: &Table) -> &'a mut TableMetadata {
  let tm = map
    .entry(table.name.clone())
    .or_insert_with(|| TableMetadata::new(&table.name, None));
  tm.comment = first_non_empty(tm.comment.take(), table.comment.as_deref());
  tm
}

fn fold_table(map: &mut TableMap, table: &Table, dialect: Dialect) {
  let tm = table_entry(map, table);
  fold_columns(tm, &table.columns, dialect);
}

fn fold_columns(tm: &mut TableMetadata, columns: &[Column], dialect: Dialect) {
  for column in columns {
    let sql_type = column.sql_type(dialect);
    let not_null = (!column.nullable).to_string();
    tm.column_mut(&column.name).fold(ColumnFacts {
      comment:       column.comment.as_deref(),
      sql_type:      sql_type.as_deref(),
      type_name:     Some(column.ty.name.as_str()),
      default_value: column.default_value.as_deref(),
      not_null:      Some(not_null.as_str()),
    });
  }
}
