//! Normalized schema facts.
//!
//! These are the reader's output: validated, ordered, catalog-independent
//! descriptions of tables and columns. A [`SchemaSnapshot`] can only be
//! built through validation ([`SchemaSnapshot::from_tables`] or the
//! reader), and exposes no mutation once built.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{ModlitError, Result};
use crate::geometry::GeometryInfo;
use crate::types::NativeType;

/// Whether a relation is a base table or a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Table,
    View,
}

impl TableKind {
    /// Parse a catalog table type (`TABLE`, `BASE TABLE`, `VIEW`, ...).
    ///
    /// Materialized views are treated as views.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "TABLE" | "BASE TABLE" => Some(Self::Table),
            "VIEW" | "MATERIALIZED VIEW" | "MATERIALIZED_VIEW" => Some(Self::View),
            _ => None,
        }
    }
}

/// A foreign-key target, by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub schema: String,
    pub table: String,
    /// Target column; `None` means "the target's primary key" and could not
    /// be looked up at read time (e.g. the target does not exist).
    pub column: Option<String>,
}

impl fmt::Display for ForeignKeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "{}.{}", self.table, column),
            None => write!(f, "{}.<pk>", self.table),
        }
    }
}

/// A column, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub native_type: NativeType,
    /// 1-based ordinal position as reported by the catalog.
    pub position: u32,
    pub nullable: bool,
    /// Default expression, verbatim.
    pub default: Option<String>,
    pub primary_key: bool,
    pub foreign_key: Option<ForeignKeyRef>,
    /// Spatial metadata; present only for geometry columns.
    pub geometry: Option<GeometryInfo>,
    /// Maximum character length, when the catalog reports it separately.
    pub max_length: Option<u32>,
    pub numeric_precision: Option<u32>,
    pub numeric_scale: Option<u32>,
}

impl ColumnSpec {
    /// Create a nullable, non-key column.
    pub fn new(name: impl Into<String>, native_type: &str) -> Self {
        Self {
            name: name.into(),
            native_type: NativeType::parse(native_type),
            position: 0,
            nullable: true,
            default: None,
            primary_key: false,
            foreign_key: None,
            geometry: GeometryInfo::from_declared(native_type),
            max_length: None,
            numeric_precision: None,
            numeric_scale: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    /// Reference a column of a table in the same schema.
    ///
    /// The schema is filled in when the column is added to a [`TableSpec`].
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key = Some(ForeignKeyRef {
            schema: String::new(),
            table: table.into(),
            column: Some(column.into()),
        });
        self
    }

    pub fn geometry(mut self, info: GeometryInfo) -> Self {
        self.geometry = Some(info);
        self
    }

    pub fn is_geometry(&self) -> bool {
        self.geometry.is_some()
    }
}

/// A unique constraint (or unique index).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueConstraint {
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// A (possibly composite) foreign-key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeySpec {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub target_schema: String,
    pub target_table: String,
    /// Empty when the target's primary key is implied and unknown.
    pub target_columns: Vec<String>,
}

/// A table or view, with columns in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub schema: String,
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<ColumnSpec>,
    pub unique_constraints: Vec<UniqueConstraint>,
    pub foreign_keys: Vec<ForeignKeySpec>,
}

impl TableSpec {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            kind: TableKind::Table,
            columns: Vec::new(),
            unique_constraints: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn view(mut self) -> Self {
        self.kind = TableKind::View;
        self
    }

    /// Append a column; positions follow append order.
    pub fn column(mut self, mut column: ColumnSpec) -> Self {
        column.position = self.columns.len() as u32 + 1;
        if let Some(fk) = column.foreign_key.as_mut() {
            if fk.schema.is_empty() {
                fk.schema = self.schema.clone();
            }
            self.foreign_keys.push(ForeignKeySpec {
                name: None,
                columns: vec![column.name.clone()],
                target_schema: fk.schema.clone(),
                target_table: fk.table.clone(),
                target_columns: fk.column.iter().cloned().collect(),
            });
        }
        self.columns.push(column);
        self
    }

    pub fn unique(mut self, columns: &[&str]) -> Self {
        self.unique_constraints.push(UniqueConstraint {
            name: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    /// Get a column by name.
    pub fn get_column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary key column names, in column order.
    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// The first geometry column, if the table has one.
    pub fn geometry_column(&self) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.is_geometry())
    }

    /// `schema.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Check structural consistency.
    pub(crate) fn validate(&self) -> Result<()> {
        let table = Some(self.name.as_str());
        if self.name.trim().is_empty() {
            return Err(ModlitError::malformed(None, None, "table without a name"));
        }

        let mut seen = HashMap::new();
        for column in &self.columns {
            if column.name.trim().is_empty() {
                return Err(ModlitError::malformed(table, None, "column without a name"));
            }
            if column.native_type.is_empty() {
                return Err(ModlitError::malformed(
                    table,
                    Some(&column.name),
                    "column without a native type",
                ));
            }
            if let Some(previous) = seen.insert(column.name.as_str(), column.position) {
                return Err(ModlitError::malformed(
                    table,
                    Some(&column.name),
                    format!(
                        "column listed twice (positions {} and {})",
                        previous, column.position
                    ),
                ));
            }
        }

        let check = |columns: &[String], what: &str| -> Result<()> {
            for name in columns {
                if !seen.contains_key(name.as_str()) {
                    return Err(ModlitError::malformed(
                        table,
                        Some(name),
                        format!("{} names a column absent from the column list", what),
                    ));
                }
            }
            Ok(())
        };

        for unique in &self.unique_constraints {
            check(&unique.columns, "unique constraint")?;
        }
        for fk in &self.foreign_keys {
            check(&fk.columns, "foreign key")?;
            if !fk.target_columns.is_empty() && fk.target_columns.len() != fk.columns.len() {
                return Err(ModlitError::malformed(
                    table,
                    fk.columns.first().map(String::as_str),
                    format!(
                        "foreign key to '{}' pairs {} columns with {} target columns",
                        fk.target_table,
                        fk.columns.len(),
                        fk.target_columns.len()
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// An immutable set of tables captured in one introspection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaSnapshot {
    tables: Vec<TableSpec>,
    #[serde(skip)]
    index: HashMap<(String, String), usize>,
}

impl SchemaSnapshot {
    /// Build a snapshot from tables, validating each of them.
    ///
    /// Table order is kept as given; it is the order synthesis follows.
    pub fn from_tables(tables: Vec<TableSpec>) -> Result<Self> {
        let mut index = HashMap::with_capacity(tables.len());
        for (i, table) in tables.iter().enumerate() {
            table.validate()?;
            let key = (table.schema.clone(), table.name.clone());
            if index.insert(key, i).is_some() {
                return Err(ModlitError::malformed(
                    Some(&table.name),
                    None,
                    format!("table listed twice in schema '{}'", table.schema),
                ));
            }
        }
        Ok(Self { tables, index })
    }

    /// Tables in catalog order.
    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    /// Look up a table by schema and name.
    pub fn table(&self, schema: &str, name: &str) -> Option<&TableSpec> {
        self.index
            .get(&(schema.to_string(), name.to_string()))
            .map(|&i| &self.tables[i])
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Distinct schema names, in order of first appearance.
    pub fn schemas(&self) -> Vec<&str> {
        let mut schemas: Vec<&str> = Vec::new();
        for table in &self.tables {
            if !schemas.contains(&table.schema.as_str()) {
                schemas.push(&table.schema);
            }
        }
        schemas
    }

    /// SHA-256 of the snapshot's canonical JSON form.
    ///
    /// Identical catalogs read with identical filters yield identical
    /// fingerprints. Returns a 64-character lowercase hex string.
    pub fn fingerprint(&self) -> String {
        // Serializing plain owned data to a string cannot fail.
        let json = serde_json::to_string(&self.tables).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
