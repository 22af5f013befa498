//! Compilation of merged hbm mapping files into a [`SchemaModel`].
//!
//! Supports the subset of the hbm vocabulary the schema needs: classes and
//! subclasses, simple and composite identifiers, properties, components,
//! many-to-one references, collections with and without their own table, and
//! secondary-table joins. Unknown elements are ignored.

use std::{collections::HashMap, fs, path::Path};

use schemagen_core::{
  Dialect,
  dedup::constraint_name,
  model::{Column, ColumnType, Entity, ForeignKey, Join, Property, SchemaModel},
};

use crate::{
  error::{Error, Result},
  xml::{self, Document, Element},
};

const ROOT_ELEMENT: &str = "hibernate-mapping";
const DEFAULT_SEQUENCE: &str = "hibernate_sequence";
/// Identifier resolution follows `key-many-to-one` references; a chain
/// longer than this is a cycle.
const MAX_REFERENCE_DEPTH: usize = 16;

/// Read every mapping file in `dir` and compile them, in file-name order.
pub fn build_model(
  dir: &Path,
  dialect: Dialect,
  schema: Option<&str>,
) -> Result<SchemaModel> {
  let documents = load(dir)?;
  let mut compiler = Compiler::new(dialect, &documents)?;
  compiler.compile()?;

  let mut model = compiler.model;
  model.schema = schema.filter(|s| !s.is_empty()).map(str::to_string);
  tracing::info!(
    dialect = %dialect,
    entities = model.entities.len(),
    tables = model.tables.len(),
    "built schema model"
  );
  Ok(model)
}

fn load(dir: &Path) -> Result<Vec<(String, Document)>> {
  let mut paths = Vec::new();
  for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
    let entry = entry.map_err(|e| Error::io(dir, e))?;
    let path = entry.path();
    if entry.file_type().map_err(|e| Error::io(&path, e))?.is_file() {
      paths.push(path);
    }
  }
  paths.sort();

  let mut documents = Vec::with_capacity(paths.len());
  for path in paths {
    let bytes = fs::read(&path).map_err(|e| Error::io(&path, e))?;
    let doc = xml::parse(&bytes).map_err(|m| Error::parse(&path, m))?;
    let file = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    tracing::debug!(%file, "loaded mapping");
    documents.push((file, doc));
  }
  Ok(documents)
}

// ─── Compiler state ──────────────────────────────────────────────────────────

struct ClassDef<'d> {
  file:    &'d str,
  name:    String,
  table:   String,
  element: &'d Element,
  /// Set for `subclass` entries, which share the parent's table and id.
  parent:  Option<usize>,
}

/// The entity whose identifier keys a collection or join table.
struct Owner<'d> {
  file:  &'d str,
  table: String,
  id:    Vec<Column>,
}

/// A `one-to-many` key column, added to the target table once every class
/// has its table.
struct DeferredKey<'d> {
  file:   &'d str,
  key:    &'d Element,
  target: usize,
  owner:  String,
  id:     Vec<Column>,
}

struct Compiler<'d> {
  dialect:  Dialect,
  classes:  Vec<ClassDef<'d>>,
  by_name:  HashMap<String, usize>,
  deferred: Vec<DeferredKey<'d>>,
  model:    SchemaModel,
}

impl<'d> Compiler<'d> {
  fn new(dialect: Dialect, documents: &'d [(String, Document)]) -> Result<Self> {
    let mut compiler = Self {
      dialect,
      classes: Vec::new(),
      by_name: HashMap::new(),
      deferred: Vec::new(),
      model: SchemaModel::new(dialect),
    };

    for (file, doc) in documents {
      if doc.root.name != ROOT_ELEMENT {
        return Err(Error::mapping(
          file.as_str(),
          format!("root element is <{}>, expected <{ROOT_ELEMENT}>", doc.root.name),
        ));
      }
      let package = doc.root.attr("package");
      for class in doc.root.elements_named("class") {
        compiler.index(file, package, class, None)?;
      }
    }
    Ok(compiler)
  }

  fn index(
    &mut self,
    file: &'d str,
    package: Option<&str>,
    element: &'d Element,
    parent: Option<usize>,
  ) -> Result<()> {
    let name = required(file, element, "name")?;
    let qualified = match package {
      Some(package) if !name.contains('.') => format!("{package}.{name}"),
      _ => name.to_string(),
    };
    let simple = simple_name(name);

    if self.by_name.contains_key(&qualified) {
      return Err(Error::mapping(file, format!("entity {qualified} is mapped twice")));
    }
    let table = match parent {
      Some(parent) => self.classes[parent].table.clone(),
      None => element.attr("table").unwrap_or(simple).to_string(),
    };

    let idx = self.classes.len();
    self.classes.push(ClassDef {
      file,
      name: qualified.clone(),
      table,
      element,
      parent,
    });
    self.by_name.insert(qualified, idx);
    self.by_name.entry(simple.to_string()).or_insert(idx);

    for sub in element.elements_named("subclass") {
      self.index(file, package, sub, Some(idx))?;
    }
    Ok(())
  }

  fn resolve(&self, file: &str, element: &Element, class: Option<&str>) -> Result<usize> {
    let class = class.ok_or_else(|| {
      Error::mapping(file, format!("<{}> has no class", element.name))
    })?;
    self
      .by_name
      .get(class)
      .or_else(|| self.by_name.get(simple_name(class)))
      .copied()
      .ok_or_else(|| Error::mapping(file, format!("unknown entity {class}")))
  }

  fn compile(&mut self) -> Result<()> {
    for idx in 0..self.classes.len() {
      self.compile_class(idx)?;
    }
    for deferred in std::mem::take(&mut self.deferred) {
      self.one_to_many_key(deferred)?;
    }
    Ok(())
  }

  // ─── Classes ───────────────────────────────────────────────────────────────

  fn compile_class(&mut self, idx: usize) -> Result<()> {
    let (file, element, name, table, parent) = {
      let class = &self.classes[idx];
      (
        class.file,
        class.element,
        class.name.clone(),
        class.table.clone(),
        class.parent,
      )
    };
    let identifier = self.identifier(idx, 0)?;

    if parent.is_none() {
      let comment = element.child("comment").map(Element::text);
      let primary = self.model.table_or_insert(&table);
      if primary.comment.as_deref().is_none_or(str::is_empty) {
        primary.comment = comment.filter(|c| !c.is_empty());
      }
      self.add_columns(&table, &identifier);
      let primary = self.model.table_or_insert(&table);
      if primary.primary_key.is_empty() {
        primary.primary_key = owned(&identifier);
      }
      self.key_references(idx)?;
      self.sequence(element);
      self.discriminator(file, &table, element)?;
    }

    let owner = Owner {
      file,
      table: table.clone(),
      id: identifier.clone(),
    };
    let mut joins = Vec::new();
    let properties = self.members(&owner, &table, element, &mut joins)?;

    tracing::debug!(entity = %name, %table, properties = properties.len(), "compiled class");
    self.model.entities.push(Entity {
      name,
      table,
      identifier,
      properties,
      joins,
    });
    Ok(())
  }

  /// Identifier columns of a class, typed and not null.
  fn identifier(&self, idx: usize, depth: usize) -> Result<Vec<Column>> {
    let class = &self.classes[idx];
    if depth > MAX_REFERENCE_DEPTH {
      return Err(Error::mapping(
        class.file,
        format!("identifier of {} references itself", class.name),
      ));
    }
    if let Some(parent) = class.parent {
      return self.identifier(parent, depth + 1);
    }

    let file = class.file;
    let mut columns = if let Some(id) = class.element.child("id") {
      let name = id.attr("name").unwrap_or("id");
      let columns = self.columns_of(file, id, &[name], ColumnType::named("long"))?;
      self.check_types(file, &columns)?;
      columns
    } else if let Some(composite) = class.element.child("composite-id") {
      let mut columns = Vec::new();
      for part in composite.elements() {
        match part.name.as_str() {
          "key-property" => {
            let name = required(file, part, "name")?;
            let part =
              self.columns_of(file, part, &[name], ColumnType::named("string"))?;
            self.check_types(file, &part)?;
            columns.extend(part);
          }
          "key-many-to-one" => {
            let name = required(file, part, "name")?;
            let target = self.resolve(file, part, part.attr("class"))?;
            let referenced = self.identifier(target, depth + 1)?;
            columns.extend(self.typed_like(file, part, &[name], &referenced)?);
          }
          _ => {}
        }
      }
      columns
    } else {
      return Err(Error::mapping(
        file,
        format!("class {} has no identifier", class.name),
      ));
    };

    for column in &mut columns {
      column.nullable = false;
    }
    Ok(columns)
  }

  /// Foreign keys for the `key-many-to-one` parts of a composite identifier.
  fn key_references(&mut self, idx: usize) -> Result<()> {
    let (file, element, table) = {
      let class = &self.classes[idx];
      (class.file, class.element, class.table.clone())
    };
    let Some(composite) = element.child("composite-id") else {
      return Ok(());
    };
    for part in composite.elements_named("key-many-to-one") {
      let name = required(file, part, "name")?;
      let target = self.resolve(file, part, part.attr("class"))?;
      let referenced = self.identifier(target, 0)?;
      let columns = self.typed_like(file, part, &[name], &referenced)?;
      let target_table = self.classes[target].table.clone();
      self.add_foreign_key(&table, part.attr("foreign-key"), &columns, &target_table, &referenced);
    }
    Ok(())
  }

  fn sequence(&mut self, class: &Element) {
    let Some(generator) = class.child("id").and_then(|id| id.child("generator"))
    else {
      return;
    };
    let kind = generator.attr("class").unwrap_or_default();
    if !matches!(
      kind,
      "sequence" | "seqhilo" | "org.hibernate.id.enhanced.SequenceStyleGenerator"
    ) {
      return;
    }
    let name = generator
      .elements_named("param")
      .find(|p| matches!(p.attr("name"), Some("sequence_name" | "sequence")))
      .map(Element::text)
      .filter(|s| !s.is_empty())
      .unwrap_or_else(|| DEFAULT_SEQUENCE.to_string());
    if !self.model.sequences.contains(&name) {
      self.model.sequences.push(name);
    }
  }

  fn discriminator(&mut self, file: &str, table: &str, class: &Element) -> Result<()> {
    let Some(discriminator) = class.child("discriminator") else {
      return Ok(());
    };
    let mut columns =
      self.columns_of(file, discriminator, &["class"], ColumnType::named("string"))?;
    self.check_types(file, &columns)?;
    for column in &mut columns {
      column.nullable = false;
    }
    self.add_columns(table, &columns);
    Ok(())
  }

  // ─── Members ───────────────────────────────────────────────────────────────

  /// Compile the property-like children of `container` into `table`.
  fn members(
    &mut self,
    owner: &Owner<'d>,
    table: &str,
    container: &'d Element,
    joins: &mut Vec<Join>,
  ) -> Result<Vec<Property>> {
    let file = owner.file;
    let mut properties = Vec::new();
    for element in container.elements() {
      match element.name.as_str() {
        "property" | "version" | "timestamp" => {
          properties.push(self.property(file, table, element)?);
        }
        "many-to-one" => properties.push(self.many_to_one(file, table, element)?),
        "component" | "dynamic-component" | "natural-id" | "properties" => {
          properties.extend(self.members(owner, table, element, joins)?);
        }
        "set" | "bag" | "list" | "idbag" | "map" | "array" | "primitive-array" => {
          properties.push(self.collection(owner, element)?);
        }
        "join" => joins.push(self.join(owner, element)?),
        _ => {}
      }
    }
    Ok(properties)
  }

  fn property(&mut self, file: &str, table: &str, element: &Element) -> Result<Property> {
    let name = required(file, element, "name")?;
    if element.attr("formula").is_some() {
      return Ok(Property {
        name:             name.to_string(),
        columns:          Vec::new(),
        collection_table: None,
      });
    }

    let versioning = matches!(element.name.as_str(), "version" | "timestamp");
    let default_type = match element.name.as_str() {
      "version" => "integer",
      "timestamp" => "timestamp",
      _ => "string",
    };
    let mut columns =
      self.columns_of(file, element, &[name], ColumnType::named(default_type))?;
    self.check_types(file, &columns)?;
    if versioning {
      for column in &mut columns {
        column.nullable = false;
      }
    }
    self.add_columns(table, &columns);

    Ok(Property {
      name: name.to_string(),
      columns,
      collection_table: None,
    })
  }

  fn many_to_one(&mut self, file: &str, table: &str, element: &Element) -> Result<Property> {
    let name = required(file, element, "name")?;
    let target = self.resolve(file, element, element.attr("class"))?;
    let referenced = self.identifier(target, 0)?;
    let columns = self.typed_like(file, element, &[name], &referenced)?;

    self.add_columns(table, &columns);
    let target_table = self.classes[target].table.clone();
    self.add_foreign_key(
      table,
      element.attr("foreign-key"),
      &columns,
      &target_table,
      &referenced,
    );

    Ok(Property {
      name: name.to_string(),
      columns,
      collection_table: None,
    })
  }

  fn collection(&mut self, owner: &Owner<'d>, element: &'d Element) -> Result<Property> {
    let file = owner.file;
    let name = required(file, element, "name")?.to_string();
    let key = element.child("key").ok_or_else(|| {
      Error::mapping(file, format!("collection {name} has no <key>"))
    })?;

    let Some(collection_table) = element.attr("table") else {
      if let Some(target) = element.child("one-to-many") {
        let target = self.resolve(file, target, target.attr("class"))?;
        self.deferred.push(DeferredKey {
          file,
          key,
          target,
          owner: owner.table.clone(),
          id: owner.id.clone(),
        });
      }
      return Ok(Property {
        name,
        columns: Vec::new(),
        collection_table: None,
      });
    };

    let owner_names = names(&owner.id);
    let mut key_columns = self.typed_like(file, key, &owner_names, &owner.id)?;
    for column in &mut key_columns {
      column.nullable = false;
    }
    self.add_columns(collection_table, &key_columns);
    self.add_foreign_key(
      collection_table,
      key.attr("foreign-key"),
      &key_columns,
      &owner.table,
      &owner.id,
    );

    let mut element_columns = Vec::new();
    if let Some(value) = element.child("element") {
      element_columns =
        self.columns_of(file, value, &["elt"], ColumnType::named("string"))?;
      self.check_types(file, &element_columns)?;
    } else if let Some(target) = element.child("many-to-many") {
      let target_idx = self.resolve(file, target, target.attr("class"))?;
      let referenced = self.identifier(target_idx, 0)?;
      let referenced_names = names(&referenced);
      element_columns = self.typed_like(file, target, &referenced_names, &referenced)?;
      let target_table = self.classes[target_idx].table.clone();
      self.add_foreign_key(
        collection_table,
        target.attr("foreign-key"),
        &element_columns,
        &target_table,
        &referenced,
      );
    } else if let Some(composite) = element.child("composite-element") {
      let mut ignored = Vec::new();
      element_columns = self
        .members(owner, collection_table, composite, &mut ignored)?
        .into_iter()
        .flat_map(|p| p.columns)
        .collect();
    }
    self.add_columns(collection_table, &element_columns);

    let mut index_columns = Vec::new();
    if let Some(index) = element
      .child("list-index")
      .or_else(|| element.child("index"))
      .or_else(|| element.child("map-key"))
    {
      let default_type = if index.name == "map-key" { "string" } else { "integer" };
      index_columns =
        self.columns_of(file, index, &["idx"], ColumnType::named(default_type))?;
      self.check_types(file, &index_columns)?;
      self.add_columns(collection_table, &index_columns);
    }

    let mut id_columns = Vec::new();
    if element.name == "idbag"
      && let Some(id) = element.child("collection-id")
    {
      id_columns = self.columns_of(file, id, &["id"], ColumnType::named("long"))?;
      self.check_types(file, &id_columns)?;
      self.add_columns(collection_table, &id_columns);
    }

    let primary_key: Vec<String> = match element.name.as_str() {
      "set" => owned(key_columns.iter().chain(&element_columns)),
      "list" | "map" | "array" | "primitive-array" => {
        owned(key_columns.iter().chain(&index_columns))
      }
      "idbag" => owned(&id_columns),
      _ => Vec::new(),
    };
    let table = self.model.table_or_insert(collection_table);
    for column in &mut table.columns {
      if primary_key.contains(&column.name) {
        column.nullable = false;
      }
    }
    if table.primary_key.is_empty() {
      table.primary_key = primary_key;
    }

    Ok(Property {
      name,
      columns: Vec::new(),
      collection_table: Some(collection_table.to_string()),
    })
  }

  fn join(&mut self, owner: &Owner<'d>, element: &'d Element) -> Result<Join> {
    let file = owner.file;
    let join_table = required(file, element, "table")?;
    let key = element.child("key").ok_or_else(|| {
      Error::mapping(file, format!("join {join_table} has no <key>"))
    })?;

    let owner_names = names(&owner.id);
    let mut key_columns = self.typed_like(file, key, &owner_names, &owner.id)?;
    for column in &mut key_columns {
      column.nullable = false;
    }
    self.add_columns(join_table, &key_columns);
    let comment = element.child("comment").map(Element::text);
    let table = self.model.table_or_insert(join_table);
    if table.primary_key.is_empty() {
      table.primary_key = owned(&key_columns);
    }
    if table.comment.is_none() {
      table.comment = comment.filter(|c| !c.is_empty());
    }
    self.add_foreign_key(
      join_table,
      key.attr("foreign-key"),
      &key_columns,
      &owner.table,
      &owner.id,
    );

    let mut nested = Vec::new();
    let properties = self.members(owner, join_table, element, &mut nested)?;
    Ok(Join {
      table: join_table.to_string(),
      properties,
    })
  }

  fn one_to_many_key(&mut self, deferred: DeferredKey<'d>) -> Result<()> {
    let DeferredKey { file, key, target, owner, id } = deferred;
    let owner_names = names(&id);
    let columns = self.typed_like(file, key, &owner_names, &id)?;
    let target_table = self.classes[target].table.clone();
    self.add_columns(&target_table, &columns);
    self.add_foreign_key(&target_table, key.attr("foreign-key"), &columns, &owner, &id);
    Ok(())
  }

  // ─── Columns ───────────────────────────────────────────────────────────────

  /// The columns an element maps: its `<column>` children, its `column`
  /// attribute, or `defaults` when neither is present.
  fn columns_of(
    &self,
    file: &str,
    element: &Element,
    defaults: &[&str],
    default_type: ColumnType,
  ) -> Result<Vec<Column>> {
    let type_name = element
      .attr("type")
      .or_else(|| element.child("type").and_then(|t| t.attr("name")));
    let mut ty = default_type;
    if let Some(type_name) = type_name {
      ty.name = type_name.to_string();
    }
    let ty = facets(file, element, ty)?;
    let not_null = flag(element, "not-null");
    let unique = flag(element, "unique");

    let nested: Vec<&Element> = element.elements_named("column").collect();
    if nested.is_empty() {
      let column_names: Vec<&str> = match element.attr("column") {
        Some(column) => vec![column],
        None => defaults.to_vec(),
      };
      return Ok(
        column_names
          .into_iter()
          .map(|name| {
            let mut column = Column::new(name, ty.clone());
            column.nullable = !not_null;
            column.unique = unique;
            column
          })
          .collect(),
      );
    }

    let mut columns = Vec::with_capacity(nested.len());
    for node in nested {
      let name = node.attr("name").ok_or_else(|| {
        Error::mapping(file, format!("<column> inside <{}> has no name", element.name))
      })?;
      let mut column = Column::new(name, facets(file, node, ty.clone())?);
      column.nullable = !(not_null || flag(node, "not-null"));
      column.unique = unique || flag(node, "unique");
      column.default_value = node.attr("default").map(str::to_string);
      column.sql_type = node.attr("sql-type").map(str::to_string);
      column.comment = node
        .child("comment")
        .map(Element::text)
        .filter(|c| !c.is_empty());
      columns.push(column);
    }
    Ok(columns)
  }

  /// Columns referencing `referenced`, typed after it.
  fn typed_like(
    &self,
    file: &str,
    element: &Element,
    defaults: &[&str],
    referenced: &[Column],
  ) -> Result<Vec<Column>> {
    let mut columns = self.columns_of(file, element, defaults, ColumnType::default())?;
    if columns.len() != referenced.len() {
      return Err(Error::mapping(
        file,
        format!(
          "<{}> maps {} column(s) but the referenced identifier has {}",
          element.name,
          columns.len(),
          referenced.len()
        ),
      ));
    }
    for (column, target) in columns.iter_mut().zip(referenced) {
      column.ty = target.ty.clone();
      if column.sql_type.is_none() {
        column.sql_type = target.sql_type.clone();
      }
    }
    Ok(columns)
  }

  fn check_types(&self, file: &str, columns: &[Column]) -> Result<()> {
    for column in columns {
      if column.sql_type(self.dialect).is_none() {
        return Err(Error::mapping(
          file,
          format!(
            "unsupported type {:?} for column {} on {}",
            column.ty.name,
            column.name,
            self.dialect.display_name()
          ),
        ));
      }
    }
    Ok(())
  }

  fn add_columns(&mut self, table: &str, columns: &[Column]) {
    let table = self.model.table_or_insert(table);
    for column in columns {
      table.add_column(column.clone());
    }
  }

  /// Every mapping site adds its own constraint, even when another site
  /// already declared the same one.
  fn add_foreign_key(
    &mut self,
    table: &str,
    explicit: Option<&str>,
    columns: &[Column],
    referenced_table: &str,
    referenced: &[Column],
  ) {
    if explicit == Some("none") {
      return;
    }
    let columns = names(columns);
    let role = match explicit {
      Some(name) => name.to_string(),
      None => format!("{table}_{}", columns.join("_")),
    };
    let foreign_key = ForeignKey {
      name: constraint_name(&role),
      columns: columns.into_iter().map(str::to_string).collect(),
      referenced_table: referenced_table.to_string(),
      referenced_columns: owned(referenced),
    };
    self.model.table_or_insert(table).foreign_keys.push(foreign_key);
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn required<'a>(file: &str, element: &'a Element, attr: &str) -> Result<&'a str> {
  element.attr(attr).ok_or_else(|| {
    Error::mapping(file, format!("<{}> is missing attribute {attr:?}", element.name))
  })
}

fn flag(element: &Element, attr: &str) -> bool {
  element.attr(attr).is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

fn facets(file: &str, element: &Element, mut ty: ColumnType) -> Result<ColumnType> {
  let number = |attr: &str| -> Result<Option<u32>> {
    element
      .attr(attr)
      .map(|v| {
        v.trim().parse::<u32>().map_err(|_| {
          Error::mapping(file, format!("invalid {attr} {v:?} on <{}>", element.name))
        })
      })
      .transpose()
  };
  if let Some(length) = number("length")? {
    ty.length = Some(length);
  }
  if let Some(precision) = number("precision")? {
    ty.precision = Some(precision);
  }
  if let Some(scale) = number("scale")? {
    ty.scale = Some(scale);
  }
  Ok(ty)
}

fn names(columns: &[Column]) -> Vec<&str> {
  columns.iter().map(|c| c.name.as_str()).collect()
}

fn owned<'a>(columns: impl IntoIterator<Item = &'a Column>) -> Vec<String> {
  columns.into_iter().map(|c| c.name.clone()).collect()
}

fn simple_name(class: &str) -> &str { class.rsplit('.').next().unwrap_or(class) }
