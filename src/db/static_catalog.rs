//! A catalog backed by a JSON dump.
//!
//! Useful for catalogs modlit has no driver for: export the rows once, then
//! synthesize from the file.
//!
//! ```json
//! {
//!   "dialect": "postgres",
//!   "schemas": [{
//!     "name": "public",
//!     "tables": [{
//!       "name": "users",
//!       "columns": [{ "name": "id", "data_type": "integer", "is_nullable": false }],
//!       "primary_key": ["id"]
//!     }]
//!   }]
//! }
//! ```

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::catalog::{
    CatalogGeometryColumn, CatalogSource, CatalogTable, CatalogTableDetail,
};
use crate::errors::{ModlitError, Result};

/// The JSON document a [`StaticCatalog`] reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDump {
    #[serde(default = "default_dialect")]
    pub dialect: String,
    #[serde(default)]
    pub schemas: Vec<SchemaDump>,
}

fn default_dialect() -> String {
    "static".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDump {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<TableDump>,
    #[serde(default)]
    pub geometry_columns: Vec<CatalogGeometryColumn>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableDump {
    pub name: Option<String>,
    #[serde(default)]
    pub table_type: Option<String>,
    #[serde(flatten)]
    pub detail: CatalogTableDetail,
}

/// An in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    dump: CatalogDump,
}

impl StaticCatalog {
    pub fn new(dump: CatalogDump) -> Self {
        Self { dump }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let dump = serde_json::from_str(json).map_err(|e| {
            ModlitError::malformed(None, None, format!("catalog dump is not valid: {}", e))
        })?;
        Ok(Self::new(dump))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ModlitError::connection(format!("reading catalog dump {}", path.display()), e)
        })?;
        Self::from_json(&json)
    }

    pub fn dump(&self) -> &CatalogDump {
        &self.dump
    }

    fn schema(&self, name: &str) -> Option<&SchemaDump> {
        self.dump.schemas.iter().find(|s| s.name == name)
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    fn dialect(&self) -> &str {
        &self.dump.dialect
    }

    async fn list_schemas(&self) -> Result<Vec<String>> {
        Ok(self.dump.schemas.iter().map(|s| s.name.clone()).collect())
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<CatalogTable>> {
        let Some(schema) = self.schema(schema) else {
            return Ok(Vec::new());
        };
        Ok(schema
            .tables
            .iter()
            .map(|t| CatalogTable {
                name: t.name.clone(),
                table_type: t.table_type.clone().unwrap_or_else(|| "TABLE".to_string()),
            })
            .collect())
    }

    async fn describe_table(&self, schema: &str, table: &str) -> Result<CatalogTableDetail> {
        self.schema(schema)
            .and_then(|s| s.tables.iter().find(|t| t.name.as_deref() == Some(table)))
            .map(|t| t.detail.clone())
            .ok_or_else(|| {
                ModlitError::malformed(
                    Some(table),
                    None,
                    format!("table is not present in schema '{}' of the dump", schema),
                )
            })
    }

    async fn geometry_columns(&self, schema: &str) -> Result<Vec<CatalogGeometryColumn>> {
        Ok(self
            .schema(schema)
            .map(|s| s.geometry_columns.clone())
            .unwrap_or_default())
    }
}
