//! The catalog-source seam.
//!
//! A [`CatalogSource`] exposes raw catalog rows. Fields that a well-formed
//! catalog always reports (names, types) are still `Option` here: the reader
//! decides what a missing value means, so every driver gets the same
//! validation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// A table or view as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTable {
    pub name: Option<String>,
    /// Catalog table type (`TABLE`, `BASE TABLE`, `VIEW`, ...).
    #[serde(default = "default_table_type")]
    pub table_type: String,
}

fn default_table_type() -> String {
    "TABLE".to_string()
}

impl CatalogTable {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            table_type: default_table_type(),
        }
    }

    pub fn view(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            table_type: "VIEW".to_string(),
        }
    }
}

/// A column row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogColumn {
    pub name: Option<String>,
    /// 1-based ordinal position.
    #[serde(default)]
    pub position: Option<u32>,
    pub data_type: Option<String>,
    #[serde(default = "default_true")]
    pub is_nullable: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub numeric_precision: Option<u32>,
    #[serde(default)]
    pub numeric_scale: Option<u32>,
}

fn default_true() -> bool {
    true
}

/// A unique constraint or unique index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogUnique {
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// A foreign-key constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogForeignKey {
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,
    /// Defaults to the referencing table's schema.
    #[serde(default)]
    pub referenced_schema: Option<String>,
    pub referenced_table: Option<String>,
    /// Empty when the constraint implicitly targets the primary key.
    #[serde(default)]
    pub referenced_columns: Vec<String>,
}

/// Everything the catalog knows about one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTableDetail {
    #[serde(default)]
    pub columns: Vec<CatalogColumn>,
    /// Primary key columns in key order.
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub unique_constraints: Vec<CatalogUnique>,
    #[serde(default)]
    pub foreign_keys: Vec<CatalogForeignKey>,
}

/// A row of the spatial metadata tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogGeometryColumn {
    pub table: String,
    pub column: String,
    /// OGC type name (`POINT`, `MULTIPOLYGON`, `GEOMETRY`, ...).
    #[serde(default)]
    pub geometry_type: Option<String>,
    #[serde(default)]
    pub srid: Option<i32>,
    #[serde(default)]
    pub coord_dimension: Option<u8>,
}

/// A database catalog the reader can introspect.
///
/// Implementations perform I/O and report driver failures as
/// [`ModlitError::Connection`](crate::errors::ModlitError::Connection).
///
/// # Example
///
/// ```ignore
/// use modlit::db::{CatalogSource, SqliteCatalog};
///
/// let catalog = SqliteCatalog::open("parcels.gpkg")?;
/// for schema in catalog.list_schemas().await? {
///     let tables = catalog.list_tables(&schema).await?;
///     println!("{}: {} tables", schema, tables.len());
/// }
/// ```
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Short name of the catalog dialect (`sqlite`, `static`, ...).
    fn dialect(&self) -> &str;

    /// List schema names.
    async fn list_schemas(&self) -> Result<Vec<String>>;

    /// List tables and views in a schema, in catalog order.
    async fn list_tables(&self, schema: &str) -> Result<Vec<CatalogTable>>;

    /// Describe one table.
    async fn describe_table(&self, schema: &str, table: &str) -> Result<CatalogTableDetail>;

    /// Spatial metadata rows for a schema. Empty if the catalog has none.
    async fn geometry_columns(&self, schema: &str) -> Result<Vec<CatalogGeometryColumn>>;

    /// Describe several tables of one schema.
    ///
    /// Default implementation fetches tables in parallel using `join_all`;
    /// results are in input order.
    async fn describe_tables(
        &self,
        schema: &str,
        tables: &[String],
    ) -> Result<Vec<CatalogTableDetail>> {
        let futures: Vec<_> = tables
            .iter()
            .map(|table| self.describe_table(schema, table))
            .collect();

        let results = futures::future::join_all(futures).await;

        results.into_iter().collect()
    }

    /// Primary key of a table, or `None` if the table does not exist or has
    /// no primary key.
    async fn primary_key(&self, schema: &str, table: &str) -> Result<Option<Vec<String>>> {
        let exists = self
            .list_tables(schema)
            .await?
            .iter()
            .any(|t| t.name.as_deref() == Some(table));
        if !exists {
            return Ok(None);
        }

        let detail = self.describe_table(schema, table).await?;
        Ok(Some(detail.primary_key).filter(|pk| !pk.is_empty()))
    }
}
