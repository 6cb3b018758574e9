//! The public entry points: "synthesize models for this catalog".
//!
//! ```ignore
//! use modlit::api::{synthesize_models, SynthesisOptions};
//! use modlit::db::SqliteCatalog;
//!
//! let catalog = SqliteCatalog::open("parcels.gpkg")?;
//! let report = synthesize_models(&catalog, &SynthesisOptions::default()).await?;
//! for bundle in &report.bundles {
//!     println!("{}: {:?}", bundle.name(), bundle.model_names());
//! }
//! ```

use std::fmt::Write;

use serde::Serialize;
use tracing::info;

use crate::config::{ConnectionSettings, Driver, Settings};
use crate::db::{read_schema, CatalogSource, ReadFilters, SchemaSnapshot, SqliteCatalog, StaticCatalog};
use crate::errors::{Diagnostic, Result, Severity};
use crate::meta::ModelMeta;
use crate::model::{NamingStrategy, ReferenceState, Synthesizer};
use crate::modules::{assemble, AssembleOptions, Grouping, ModuleBundle};
use crate::types::{AttributeType, TypeKey, TypeMapping, TypeRegistry};

/// Everything that shapes a synthesis run.
#[derive(Debug, Clone, Default)]
pub struct SynthesisOptions {
    pub filters: ReadFilters,
    pub naming: NamingStrategy,
    pub grouping: Grouping,
    pub assemble: AssembleOptions,
    pub meta: Option<ModelMeta>,
}

impl SynthesisOptions {
    /// Build options from the non-connection sections of the settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            filters: settings.filters.to_filters()?,
            naming: settings.naming.strategy()?,
            grouping: settings.modules.grouping()?,
            assemble: settings.modules.assemble_options(),
            meta: settings.meta.clone(),
        })
    }
}

/// Output of a synthesis run.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisReport {
    pub bundles: Vec<ModuleBundle>,
    /// Synthesis diagnostics followed by assembly diagnostics.
    pub diagnostics: Vec<Diagnostic>,
    /// The catalog facts the models were built from.
    pub snapshot: SchemaSnapshot,
    pub meta: Option<ModelMeta>,
    pub urn: Option<String>,
}

impl SynthesisReport {
    pub fn bundle(&self, name: &str) -> Option<&ModuleBundle> {
        self.bundles.iter().find(|b| b.name() == name)
    }

    pub fn model_count(&self) -> usize {
        self.bundles.iter().map(ModuleBundle::len).sum()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    /// Render a plain-text outline of the bundles and diagnostics.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        if let (Some(meta), Some(urn)) = (&self.meta, &self.urn) {
            let _ = writeln!(out, "{} ({})", meta.title, urn);
        }
        for bundle in &self.bundles {
            let _ = writeln!(out, "module {}", bundle.name());
            for model in bundle.models() {
                let _ = writeln!(out, "  {} <- {}", model.name, model.qualified_table());
                for attribute in &model.attributes {
                    let _ = write!(out, "    {}: {}", attribute.name(), attribute.resolved);
                    if attribute.is_primary_key() {
                        out.push_str(" [pk]");
                    }
                    if let Some(reference) = &attribute.reference {
                        match &reference.state {
                            ReferenceState::Resolved {
                                model,
                                attribute: target,
                            } => {
                                let _ = write!(out, " -> {}.{}", model, target);
                            }
                            _ => {
                                let _ = write!(out, " -> ? {}", reference.target);
                            }
                        }
                    }
                    out.push('\n');
                }
            }
        }
        for diagnostic in &self.diagnostics {
            let _ = writeln!(out, "{}", diagnostic);
        }
        out
    }
}

/// Read, synthesize and assemble using the process-wide type registry.
pub async fn synthesize_models<S>(source: &S, options: &SynthesisOptions) -> Result<SynthesisReport>
where
    S: CatalogSource + ?Sized,
{
    synthesize_models_with(source, options, TypeRegistry::global()).await
}

/// Read, synthesize and assemble using an explicit type registry.
///
/// # Errors
///
/// Any fatal error of the reader, synthesizer or assembler. Non-fatal
/// conditions are returned in [`SynthesisReport::diagnostics`].
pub async fn synthesize_models_with<S>(
    source: &S,
    options: &SynthesisOptions,
    registry: &TypeRegistry,
) -> Result<SynthesisReport>
where
    S: CatalogSource + ?Sized,
{
    let snapshot = read_schema(source, &options.filters).await?;

    let synthesis = Synthesizer::new(registry)
        .naming(options.naming)
        .synthesize(&snapshot)?;

    let grouping = &options.grouping;
    let assembly = assemble(synthesis.models, |m| grouping.key(m), &options.assemble)?;

    let mut diagnostics = synthesis.diagnostics;
    diagnostics.extend(assembly.diagnostics);

    let urn = options.meta.as_ref().map(ModelMeta::urn);
    info!(
        dialect = source.dialect(),
        modules = assembly.bundles.len(),
        diagnostics = diagnostics.len(),
        urn = urn.as_deref().unwrap_or(""),
        "synthesized models"
    );

    Ok(SynthesisReport {
        bundles: assembly.bundles,
        diagnostics,
        snapshot,
        meta: options.meta.clone(),
        urn,
    })
}

/// Open the catalog a `[connection]` section describes.
pub fn open_catalog(settings: &ConnectionSettings) -> Result<Box<dyn CatalogSource>> {
    let path = settings.resolved_path()?;
    let source: Box<dyn CatalogSource> = match settings.driver_type()? {
        Driver::Sqlite => Box::new(SqliteCatalog::open(&path)?),
        Driver::CatalogJson => Box::new(StaticCatalog::from_path(&path)?),
    };
    Ok(source)
}

/// Register the `[[types]]` entries of the settings.
///
/// Every entry is validated before anything is registered, and the batch is
/// applied atomically: a conflict with an existing mapping fails with
/// `DuplicateTypeMapping` and leaves the registry unchanged. Identical
/// entries are accepted. A geometry entry with a subtype is registered for
/// that subtype, plus a generic geometry entry if the native type has none.
pub fn register_types(settings: &Settings, registry: &TypeRegistry) -> Result<()> {
    let mut mappings = Vec::with_capacity(settings.types.len());
    let mut fallbacks = Vec::new();
    for entry in &settings.types {
        let mapping = entry.mapping()?;
        match mapping.attribute_type {
            AttributeType::Geometry(Some(subtype)) => {
                mappings.push((TypeKey::geometry(&entry.native, subtype), mapping));
                fallbacks.push((TypeKey::plain(&entry.native), TypeMapping::geometry(None)));
            }
            _ => mappings.push((TypeKey::plain(&entry.native), mapping)),
        }
    }
    registry.register_all(mappings, fallbacks)
}

/// Run the whole pipeline as configured.
///
/// Custom types are registered with the process-wide registry.
pub async fn synthesize_from_settings(settings: &Settings) -> Result<SynthesisReport> {
    let registry = TypeRegistry::global();
    register_types(settings, registry)?;

    let options = SynthesisOptions::from_settings(settings)?;
    let source = open_catalog(&settings.connection()?)?;
    synthesize_models_with(source.as_ref(), &options, registry).await
}
