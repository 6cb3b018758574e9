//! Catalog introspection.
//!
//! ```text
//! ┌──────────────────┐   raw rows    ┌──────────────┐   SchemaSnapshot
//! │  CatalogSource   │ ────────────▶ │ read_schema  │ ────────────────▶
//! │ (sqlite, static) │               │ + ReadFilters│
//! └──────────────────┘               └──────────────┘
//! ```
//!
//! Drivers only fetch rows; all validation and normalization happens in
//! [`read_schema`], so every catalog is held to the same rules.

mod catalog;
mod filters;
mod reader;
mod snapshot;
mod sqlite;
mod static_catalog;

pub use catalog::{
    CatalogColumn, CatalogForeignKey, CatalogGeometryColumn, CatalogSource, CatalogTable,
    CatalogTableDetail, CatalogUnique,
};
pub use filters::{ReadFilters, TableNamePattern};
pub use reader::read_schema;
pub use snapshot::{
    ColumnSpec, ForeignKeyRef, ForeignKeySpec, SchemaSnapshot, TableKind, TableSpec,
    UniqueConstraint,
};
pub use sqlite::SqliteCatalog;
pub use static_catalog::{CatalogDump, SchemaDump, StaticCatalog, TableDump};
