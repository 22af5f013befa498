//! The schema model a [`SchemaBuilder`](crate::SchemaBuilder) produces.
//!
//! Read-only to everything in this crate. Entities reference tables by name;
//! [`SchemaModel::table`] resolves those names.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;

// ─── Columns ─────────────────────────────────────────────────────────────────

/// A mapping-level column type plus its size facets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnType {
  /// The type name as written in the mapping (e.g. `long`, `string`).
  pub name:      String,
  pub length:    Option<u32>,
  pub precision: Option<u32>,
  pub scale:     Option<u32>,
}

impl ColumnType {
  pub fn named(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }
}

/// Everything one mapping site states about a column.
///
/// The same physical column can be described by several sites (the owning
/// table, a property, an identifier) with different levels of detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
  pub name:          String,
  pub comment:       Option<String>,
  pub ty:            ColumnType,
  /// Explicit SQL type; wins over the dialect's derivation.
  pub sql_type:      Option<String>,
  pub default_value: Option<String>,
  pub nullable:      bool,
  pub unique:        bool,
}

impl Column {
  pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
    Self {
      name: name.into(),
      comment: None,
      ty,
      sql_type: None,
      default_value: None,
      nullable: true,
      unique: false,
    }
  }

  /// The SQL type string of this column under `dialect`.
  pub fn sql_type(&self, dialect: Dialect) -> Option<String> {
    match &self.sql_type {
      Some(explicit) if !explicit.is_empty() => Some(explicit.clone()),
      _ => dialect.sql_type(&self.ty),
    }
  }
}

// ─── Tables ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
  pub name:               String,
  pub columns:            Vec<String>,
  pub referenced_table:   String,
  pub referenced_columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
  pub name:         String,
  pub comment:      Option<String>,
  /// Columns in discovery order.
  pub columns:      Vec<Column>,
  pub primary_key:  Vec<String>,
  pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }

  pub fn column(&self, name: &str) -> Option<&Column> {
    self.columns.iter().find(|c| c.name == name)
  }

  /// Add `column` unless a column of that name exists already. Returns whether
  /// it was added.
  pub fn add_column(&mut self, column: Column) -> bool {
    if self.column(&column.name).is_some() {
      return false;
    }
    self.columns.push(column);
    true
  }
}

// ─── Entities ────────────────────────────────────────────────────────────────

/// A mapped property. Collection-valued properties point at their backing
/// table, if they have one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
  pub name:             String,
  pub columns:          Vec<Column>,
  pub collection_table: Option<String>,
}

/// A secondary table joined to an entity's primary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
  pub table:      String,
  pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
  pub name:       String,
  /// Name of the primary table.
  pub table:      String,
  pub identifier: Vec<Column>,
  pub properties: Vec<Property>,
  pub joins:      Vec<Join>,
}

// ─── Model ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaModel {
  pub dialect:   Dialect,
  /// Schema used to qualify table names in generated scripts.
  pub schema:    Option<String>,
  pub entities:  Vec<Entity>,
  /// Tables in creation order.
  pub tables:    Vec<Table>,
  pub sequences: Vec<String>,
}

impl SchemaModel {
  pub fn new(dialect: Dialect) -> Self {
    Self {
      dialect,
      schema: None,
      entities: Vec::new(),
      tables: Vec::new(),
      sequences: Vec::new(),
    }
  }

  pub fn table(&self, name: &str) -> Option<&Table> {
    self.tables.iter().find(|t| t.name == name)
  }

  /// Return the named table, appending an empty one on first use.
  pub fn table_or_insert(&mut self, name: &str) -> &mut Table {
    let idx = match self.tables.iter().position(|t| t.name == name) {
      Some(idx) => idx,
      None => {
        self.tables.push(Table::new(name));
        self.tables.len() - 1
      }
    };
    &mut self.tables[idx]
  }

  /// `schema.table` when a schema is set, otherwise the bare name.
  pub fn qualified(&self, table: &str) -> String {
    match self.schema.as_deref() {
      Some(schema) if !schema.is_empty() => format!("{schema}.{table}"),
      _ => table.to_string(),
    }
  }
}
