//! Target SQL dialects and their capabilities.
//!
//! A dialect is used in exactly two places: by the schema builder when it
//! renders DDL, and by metadata extraction when it derives the SQL type string
//! of a column.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error::Error, model::ColumnType};

const DEFAULT_VARCHAR_LENGTH: u32 = 255;
const DEFAULT_PRECISION: u32 = 19;
const DEFAULT_SCALE: u32 = 2;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
  Postgis,
  Oracle,
  Geodb,
  MySqlSpatial5,
  SqlServer2008,
}

/// The mapping-level type vocabulary, after alias resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Logical {
  Long,
  Integer,
  Short,
  String,
  Text,
  Boolean,
  SmallBoolean,
  Timestamp,
  Date,
  Time,
  Double,
  Float,
  BigDecimal,
  Geometry,
  Binary,
  Character,
}

fn logical(type_name: &str) -> Option<Logical> {
  let lowered = type_name.trim().to_ascii_lowercase();
  let name = lowered.rsplit('.').next().unwrap_or(&lowered);
  let logical = match name {
    "long" | "big_integer" => Logical::Long,
    "integer" | "int" => Logical::Integer,
    "short" => Logical::Short,
    "string" => Logical::String,
    "text" | "materialized_clob" | "clob" => Logical::Text,
    "boolean" | "true_false" | "yes_no" => Logical::Boolean,
    "small_boolean" | "smallbooleantype" => Logical::SmallBoolean,
    "timestamp" | "calendar" => Logical::Timestamp,
    "date" => Logical::Date,
    "time" => Logical::Time,
    "double" => Logical::Double,
    "float" => Logical::Float,
    "big_decimal" | "bigdecimal" => Logical::BigDecimal,
    "geometry" | "jts_geometry" | "geometrytype" | "jtsgeometrytype" => {
      Logical::Geometry
    }
    "binary" | "materialized_blob" | "blob" => Logical::Binary,
    "character" | "char" => Logical::Character,
    _ => return None,
  };
  Some(logical)
}

impl Dialect {
  pub const ALL: [Dialect; 5] = [
    Dialect::Postgis,
    Dialect::Oracle,
    Dialect::Geodb,
    Dialect::MySqlSpatial5,
    Dialect::SqlServer2008,
  ];

  /// Kebab-case label; used on the command line and in script file names.
  pub fn label(self) -> &'static str {
    match self {
      Self::Postgis => "postgis",
      Self::Oracle => "oracle",
      Self::Geodb => "geodb",
      Self::MySqlSpatial5 => "my-sql-spatial-5",
      Self::SqlServer2008 => "sql-server-2008",
    }
  }

  /// The name shown in generated documentation.
  pub fn display_name(self) -> &'static str {
    match self {
      Self::Postgis => "PostgisPG95Dialect",
      Self::Oracle => "OracleSpatial10gDialect",
      Self::Geodb => "GeoDBDialect",
      Self::MySqlSpatial5 => "MySQL56SpatialDialect",
      Self::SqlServer2008 => "SqlServer2008SpatialDialect",
    }
  }

  /// The schema `all` mode generates into when none is configured.
  pub fn default_schema(self) -> Option<&'static str> {
    match self {
      Self::Postgis => Some("public"),
      Self::SqlServer2008 => Some("dbo"),
      Self::Oracle | Self::Geodb | Self::MySqlSpatial5 => None,
    }
  }

  pub fn supports_sequences(self) -> bool {
    !matches!(self, Self::MySqlSpatial5 | Self::SqlServer2008)
  }

  /// Whether `drop`/`alter table` accept `if exists`.
  pub fn supports_if_exists(self) -> bool {
    matches!(self, Self::Postgis | Self::Geodb)
  }

  /// Suffix appended to `drop table`.
  pub fn drop_table_suffix(self) -> &'static str {
    match self {
      Self::Postgis | Self::Geodb => " cascade",
      Self::Oracle => " cascade constraints",
      Self::MySqlSpatial5 | Self::SqlServer2008 => "",
    }
  }

  /// Keyword used to drop a foreign key constraint.
  pub fn drop_foreign_key_keyword(self) -> &'static str {
    match self {
      Self::MySqlSpatial5 => "drop foreign key",
      _ => "drop constraint",
    }
  }

  /// Derive the SQL type string for a mapped column type. `None` for type
  /// names outside the supported vocabulary.
  pub fn sql_type(self, ty: &ColumnType) -> Option<String> {
    let length = ty.length.unwrap_or(DEFAULT_VARCHAR_LENGTH);
    let precision = ty.precision.unwrap_or(DEFAULT_PRECISION);
    let scale = ty.scale.unwrap_or(DEFAULT_SCALE);
    let sql = match (self, logical(&ty.name)?) {
      (Self::Postgis, l) => match l {
        Logical::Long => "int8".into(),
        Logical::Integer => "int4".into(),
        Logical::Short | Logical::SmallBoolean => "int2".into(),
        Logical::String => format!("varchar({length})"),
        Logical::Text => "text".into(),
        Logical::Boolean => "boolean".into(),
        Logical::Timestamp => "timestamp".into(),
        Logical::Date => "date".into(),
        Logical::Time => "time".into(),
        Logical::Double => "float8".into(),
        Logical::Float => "float4".into(),
        Logical::BigDecimal => format!("numeric({precision}, {scale})"),
        Logical::Geometry => "geometry".into(),
        Logical::Binary => "bytea".into(),
        Logical::Character => "char(1)".into(),
      },
      (Self::Oracle, l) => match l {
        Logical::Long => "number(19,0)".into(),
        Logical::Integer => "number(10,0)".into(),
        Logical::Short => "number(5,0)".into(),
        Logical::Boolean | Logical::SmallBoolean => "number(1,0)".into(),
        Logical::String => format!("varchar2({length} char)"),
        Logical::Text => "clob".into(),
        Logical::Timestamp => "timestamp".into(),
        Logical::Date | Logical::Time => "date".into(),
        Logical::Double => "double precision".into(),
        Logical::Float => "float".into(),
        Logical::BigDecimal => format!("number({precision},{scale})"),
        Logical::Geometry => "SDO_GEOMETRY".into(),
        Logical::Binary => "blob".into(),
        Logical::Character => "char(1 char)".into(),
      },
      (Self::Geodb, l) => match l {
        Logical::Long => "bigint".into(),
        Logical::Integer => "integer".into(),
        Logical::Short | Logical::SmallBoolean => "smallint".into(),
        Logical::String => format!("varchar({length})"),
        Logical::Text => "clob".into(),
        Logical::Boolean => "boolean".into(),
        Logical::Timestamp => "timestamp".into(),
        Logical::Date => "date".into(),
        Logical::Time => "time".into(),
        Logical::Double => "double".into(),
        Logical::Float => "float".into(),
        Logical::BigDecimal => format!("decimal({precision},{scale})"),
        Logical::Geometry | Logical::Binary => "blob".into(),
        Logical::Character => "char(1)".into(),
      },
      (Self::MySqlSpatial5, l) => match l {
        Logical::Long => "bigint".into(),
        Logical::Integer => "integer".into(),
        Logical::Short | Logical::SmallBoolean => "smallint".into(),
        Logical::String => format!("varchar({length})"),
        Logical::Text => "longtext".into(),
        Logical::Boolean => "bit".into(),
        Logical::Timestamp => "datetime".into(),
        Logical::Date => "date".into(),
        Logical::Time => "time".into(),
        Logical::Double => "double precision".into(),
        Logical::Float => "float".into(),
        Logical::BigDecimal => format!("decimal({precision},{scale})"),
        Logical::Geometry => "GEOMETRY".into(),
        Logical::Binary => "longblob".into(),
        Logical::Character => "char(1)".into(),
      },
      (Self::SqlServer2008, l) => match l {
        Logical::Long => "bigint".into(),
        Logical::Integer => "int".into(),
        Logical::Short | Logical::SmallBoolean => "smallint".into(),
        Logical::String => format!("varchar({length})"),
        Logical::Text => "varchar(MAX)".into(),
        Logical::Boolean => "bit".into(),
        Logical::Timestamp => "datetime2".into(),
        Logical::Date => "date".into(),
        Logical::Time => "time".into(),
        Logical::Double => "double precision".into(),
        Logical::Float => "float".into(),
        Logical::BigDecimal => format!("numeric({precision},{scale})"),
        Logical::Geometry => "GEOMETRY".into(),
        Logical::Binary => "varbinary(MAX)".into(),
        Logical::Character => "char(1)".into(),
      },
    };
    Some(sql)
  }
}

impl fmt::Display for Dialect {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl FromStr for Dialect {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
      "postgis" | "postgres" | "postgresql" => Ok(Self::Postgis),
      "oracle" => Ok(Self::Oracle),
      "geodb" | "h2" => Ok(Self::Geodb),
      "my-sql-spatial-5" | "mysql" => Ok(Self::MySqlSpatial5),
      "sql-server-2008" | "sqlserver" | "mssql" => Ok(Self::SqlServer2008),
      _ => Err(Error::InvalidDialect(s.to_string())),
    }
  }
}
