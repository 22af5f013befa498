//! DDL rendering of a [`SchemaModel`].
//!
//! Statements carry no trailing delimiter; the caller joins them.

use schemagen_core::model::{SchemaModel, Table};

use crate::error::{Error, Result};

/// Sequences, then tables, then foreign keys.
pub fn create(model: &SchemaModel) -> Result<Vec<String>> {
  let dialect = model.dialect;
  let mut lines = Vec::new();

  if dialect.supports_sequences() {
    for sequence in &model.sequences {
      lines.push(format!(
        "create sequence {} start with 1 increment by 1",
        model.qualified(sequence)
      ));
    }
  }

  for table in &model.tables {
    lines.push(create_table(model, table)?);
  }

  for table in &model.tables {
    for fk in &table.foreign_keys {
      lines.push(format!(
        "alter table {} add constraint {} foreign key ({}) references {}",
        model.qualified(&table.name),
        fk.name,
        fk.columns.join(", "),
        model.qualified(&fk.referenced_table),
      ));
    }
  }

  tracing::debug!(statements = lines.len(), "rendered create script");
  Ok(lines)
}

/// Foreign keys, then tables in reverse creation order, then sequences.
pub fn drop(model: &SchemaModel) -> Result<Vec<String>> {
  let dialect = model.dialect;
  let if_exists = if dialect.supports_if_exists() { "if exists " } else { "" };
  let mut lines = Vec::new();

  for table in &model.tables {
    for fk in &table.foreign_keys {
      lines.push(format!(
        "alter table {if_exists}{} {} {}",
        model.qualified(&table.name),
        dialect.drop_foreign_key_keyword(),
        fk.name
      ));
    }
  }

  for table in model.tables.iter().rev() {
    lines.push(format!(
      "drop table {if_exists}{}{}",
      model.qualified(&table.name),
      dialect.drop_table_suffix()
    ));
  }

  if dialect.supports_sequences() {
    for sequence in &model.sequences {
      lines.push(format!("drop sequence {if_exists}{}", model.qualified(sequence)));
    }
  }

  tracing::debug!(statements = lines.len(), "rendered drop script");
  Ok(lines)
}

fn create_table(model: &SchemaModel, table: &Table) -> Result<String> {
  let mut parts = Vec::with_capacity(table.columns.len() + 1);
  for column in &table.columns {
    let sql_type = column.sql_type(model.dialect).ok_or_else(|| {
      Error::mapping(
        table.name.as_str(),
        format!("column {} has unsupported type {:?}", column.name, column.ty.name),
      )
    })?;
    let mut part = format!("{} {sql_type}", column.name);
    if let Some(default) = &column.default_value {
      part.push_str(" default ");
      part.push_str(default);
    }
    if !column.nullable {
      part.push_str(" not null");
    }
    if column.unique {
      part.push_str(" unique");
    }
    parts.push(part);
  }
  if !table.primary_key.is_empty() {
    parts.push(format!("primary key ({})", table.primary_key.join(", ")));
  }
  Ok(format!(
    "create table {} ({})",
    model.qualified(&table.name),
    parts.join(", ")
  ))
}

#[cfg(test)]
mod tests {
  use schemagen_core::{
    Dialect,
    model::{Column, ColumnType, ForeignKey},
  };

  use super::*;

  fn model(dialect: Dialect) -> SchemaModel {
    let mut model = SchemaModel::new(dialect);
    model.sequences.push("dataset_seq".into());

    let phenomenon = model.table_or_insert("phenomenon");
    let mut id = Column::new("phenomenon_id", ColumnType::named("long"));
    id.nullable = false;
    phenomenon.columns.push(id);
    phenomenon.primary_key = vec!["phenomenon_id".into()];

    let dataset = model.table_or_insert("dataset");
    let mut id = Column::new("dataset_id", ColumnType::named("long"));
    id.nullable = false;
    dataset.columns.push(id);
    let mut kind = Column::new("kind", ColumnType::named("string"));
    kind.default_value = Some("'not_initialized'".into());
    dataset.columns.push(kind);
    dataset
      .columns
      .push(Column::new("fk_phenomenon_id", ColumnType::named("long")));
    dataset.primary_key = vec!["dataset_id".into()];
    dataset.foreign_keys.push(ForeignKey {
      name:               "FK1".into(),
      columns:            vec!["fk_phenomenon_id".into()],
      referenced_table:   "phenomenon".into(),
      referenced_columns: vec!["phenomenon_id".into()],
    });
    model
  }

  #[test]
  fn create_on_postgis() {
    let mut model = model(Dialect::Postgis);
    model.schema = Some("public".into());
    let lines = create(&model).unwrap();
    assert_eq!(lines, [
      "create sequence public.dataset_seq start with 1 increment by 1",
      "create table public.phenomenon (phenomenon_id int8 not null, primary key (phenomenon_id))",
      "create table public.dataset (dataset_id int8 not null, kind varchar(255) default 'not_initialized', fk_phenomenon_id int8, primary key (dataset_id))",
      "alter table public.dataset add constraint FK1 foreign key (fk_phenomenon_id) references public.phenomenon",
    ]);
  }

  #[test]
  fn drop_on_postgis() {
    let lines = drop(&model(Dialect::Postgis)).unwrap();
    assert_eq!(lines, [
      "alter table if exists dataset drop constraint FK1",
      "drop table if exists dataset cascade",
      "drop table if exists phenomenon cascade",
      "drop sequence if exists dataset_seq",
    ]);
  }

  #[test]
  fn mysql_has_no_sequences_and_drops_foreign_keys() {
    let model = model(Dialect::MySqlSpatial5);
    let create = create(&model).unwrap();
    assert!(create.iter().all(|l| !l.contains("sequence")));
    assert!(create[0].starts_with("create table phenomenon (phenomenon_id bigint"));

    let drop = drop(&model).unwrap();
    assert_eq!(drop[0], "alter table dataset drop foreign key FK1");
    assert_eq!(drop.last().unwrap(), "drop table phenomenon");
  }

  #[test]
  fn oracle_cascades_constraints() {
    let drop = drop(&model(Dialect::Oracle)).unwrap();
    assert!(drop.contains(&"drop table dataset cascade constraints".to_string()));
    assert!(drop.contains(&"drop sequence dataset_seq".to_string()));
  }

  #[test]
  fn unknown_type_fails_rendering() {
    let mut model = model(Dialect::Postgis);
    model.tables[0]
      .columns
      .push(Column::new("odd", ColumnType::named("mystery")));
    assert!(matches!(create(&model), Err(Error::Mapping { .. })));
  }
}
