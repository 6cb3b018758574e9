//! # modlit
//!
//! Introspects a relational catalog (spatial columns included) and
//! synthesizes typed, in-memory model descriptors that mirror its schema.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          CatalogSource (SQLite / GeoPackage / JSON)      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [db::read_schema + ReadFilters]
//! ┌─────────────────────────────────────────────────────────┐
//! │                    SchemaSnapshot                        │
//! │        (tables, columns, keys, spatial metadata)         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [model::Synthesizer + TypeRegistry]
//! ┌─────────────────────────────────────────────────────────┐
//! │                   ModelDescriptors                       │
//! │      (typed attributes, resolved references)             │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [modules::assemble]
//! ┌─────────────────────────────────────────────────────────┐
//! │              ModuleBundles + Diagnostics                 │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! [`api`] wires the stages together. Fatal problems are returned as
//! [`ModlitError`]; recoverable ones (unknown types, dangling references,
//! empty modules) come back as [`Diagnostic`]s next to the output.

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod geometry;
pub mod meta;
pub mod model;
pub mod modules;
pub mod types;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::api::{
        synthesize_from_settings, synthesize_models, synthesize_models_with, SynthesisOptions,
        SynthesisReport,
    };
    pub use crate::db::{
        read_schema, CatalogSource, ColumnSpec, ReadFilters, SchemaSnapshot, SqliteCatalog,
        StaticCatalog, TableNamePattern, TableSpec,
    };
    pub use crate::errors::{Diagnostic, DiagnosticKind, ModlitError, Result, Severity};
    pub use crate::geometry::{GeometryInfo, GeometrySubtype};
    pub use crate::meta::ModelMeta;
    pub use crate::model::{
        AttributeDescriptor, ModelDescriptor, NamingStrategy, ReferenceState, ResolvedType,
        Synthesizer,
    };
    pub use crate::modules::{assemble, AssembleOptions, Grouping, ModuleBundle};
    pub use crate::types::{PrimitiveKind, TypeMapping, TypeRegistry};
}

pub use api::{synthesize_models, SynthesisOptions, SynthesisReport};
pub use errors::{Diagnostic, ModlitError, Result};
