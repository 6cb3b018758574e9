//! Module assembly: grouping model descriptors into named bundles.
//!
//! A [`ModuleBundle`] is the unit downstream code materializes (one Python
//! module, one Rust file, one schema document, ...). Bundles are never
//! empty, model names are unique within a bundle, and every resolved
//! reference points at a model of the same bundle.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::errors::{Diagnostic, DiagnosticKind, ModlitError, Result};
use crate::model::{ModelDescriptor, ReferenceState};

/// A named, ordered group of model descriptors.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleBundle {
    name: String,
    models: Vec<ModelDescriptor>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ModuleBundle {
    fn new(name: String) -> Self {
        Self {
            name,
            models: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn push(&mut self, model: ModelDescriptor) -> Result<()> {
        if let Some(&existing) = self.index.get(&model.name) {
            let second_table = model.qualified_table();
            return Err(ModlitError::NameCollision {
                model: model.name,
                first_table: self.models[existing].qualified_table(),
                second_table,
            });
        }
        self.index.insert(model.name.clone(), self.models.len());
        self.models.push(model);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Models in synthesis order.
    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    /// Look up a model by name.
    pub fn get(&self, model: &str) -> Option<&ModelDescriptor> {
        self.index.get(model).map(|&i| &self.models[i])
    }

    /// Look up a model by its source table.
    pub fn by_table(&self, schema: &str, table: &str) -> Option<&ModelDescriptor> {
        self.models
            .iter()
            .find(|m| m.schema == schema && m.table == table)
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Options for [`assemble`].
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Modules the caller expects to exist.
    pub declared: Vec<String>,
    /// Whether a declared module that receives no models is only reported
    /// (`true`) or fails the assembly (`false`).
    pub allow_empty: bool,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            declared: Vec::new(),
            allow_empty: true,
        }
    }
}

/// Output of [`assemble`].
#[derive(Debug, Clone, Serialize)]
pub struct Assembly {
    /// Bundles in order of first key occurrence.
    pub bundles: Vec<ModuleBundle>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Assembly {
    pub fn bundle(&self, name: &str) -> Option<&ModuleBundle> {
        self.bundles.iter().find(|b| b.name == name)
    }
}

/// Group models by schema.
pub fn by_schema(model: &ModelDescriptor) -> String {
    model.schema.clone()
}

/// Group models by the table-name prefix before `separator`
/// (`gis_parcels` → `gis`). Tables without the separator are grouped by
/// schema.
pub fn by_table_prefix(separator: impl Into<String>) -> impl Fn(&ModelDescriptor) -> String {
    let separator = separator.into();
    move |model: &ModelDescriptor| table_prefix(model, &separator)
}

fn table_prefix(model: &ModelDescriptor, separator: &str) -> String {
    if separator.is_empty() {
        return model.schema.clone();
    }
    match model.table.split_once(separator) {
        Some((prefix, _)) if !prefix.is_empty() => prefix.to_string(),
        _ => model.schema.clone(),
    }
}

/// A built-in grouping key, selectable from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Grouping {
    #[default]
    Schema,
    TablePrefix(String),
}

impl Grouping {
    /// The bundle name for a model.
    pub fn key(&self, model: &ModelDescriptor) -> String {
        match self {
            Self::Schema => by_schema(model),
            Self::TablePrefix(separator) => table_prefix(model, separator),
        }
    }
}

/// Partition descriptors into bundles by `key`.
///
/// Synthesis order is kept within each bundle.
///
/// # Errors
///
/// - [`ModlitError::NameCollision`] if two models of one bundle share a name.
/// - [`ModlitError::EmptyBundle`] if a declared module receives no models
///   and `allow_empty` is false.
///
/// References resolved during synthesis whose target landed in another
/// bundle are marked dangling and reported as diagnostics.
pub fn assemble<F>(
    descriptors: Vec<ModelDescriptor>,
    key: F,
    options: &AssembleOptions,
) -> Result<Assembly>
where
    F: Fn(&ModelDescriptor) -> String,
{
    let mut bundles: Vec<ModuleBundle> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for model in descriptors {
        let name = key(&model);
        let idx = match positions.get(&name) {
            Some(&idx) => idx,
            None => {
                positions.insert(name.clone(), bundles.len());
                bundles.push(ModuleBundle::new(name));
                bundles.len() - 1
            }
        };
        bundles[idx].push(model)?;
    }

    let mut diagnostics = Vec::new();
    for module in &options.declared {
        if positions.contains_key(module) {
            continue;
        }
        let err = ModlitError::EmptyBundle {
            module: module.clone(),
        };
        if !options.allow_empty {
            return Err(err);
        }
        diagnostics.push(Diagnostic::downgrade(err)?);
    }

    detach_cross_bundle_references(&mut bundles, &mut diagnostics);

    for diagnostic in &diagnostics {
        diagnostic.trace();
    }
    for bundle in &bundles {
        debug!(module = %bundle.name, models = ?bundle.model_names(), "assembled module");
    }
    info!(
        modules = bundles.len(),
        diagnostics = diagnostics.len(),
        "assembly complete"
    );
    Ok(Assembly {
        bundles,
        diagnostics,
    })
}

fn detach_cross_bundle_references(bundles: &mut [ModuleBundle], diagnostics: &mut Vec<Diagnostic>) {
    let home: HashMap<(&str, &str), usize> = bundles
        .iter()
        .enumerate()
        .flat_map(|(i, b)| {
            b.models
                .iter()
                .map(move |m| ((m.schema.as_str(), m.name.as_str()), i))
        })
        .collect();

    let mut detached = Vec::new();
    for (bundle_idx, bundle) in bundles.iter().enumerate() {
        for (model_idx, model) in bundle.models.iter().enumerate() {
            for (attr_idx, attribute) in model.attributes.iter().enumerate() {
                let Some(reference) = &attribute.reference else {
                    continue;
                };
                let Some(target) = reference.model() else {
                    continue;
                };
                let target_bundle = home.get(&(reference.target.schema.as_str(), target));
                if target_bundle != Some(&bundle_idx) {
                    diagnostics.push(Diagnostic::warning(DiagnosticKind::DanglingReference {
                        table: model.table.clone(),
                        column: attribute.name().to_string(),
                        target: reference.target.to_string(),
                    }));
                    detached.push((bundle_idx, model_idx, attr_idx));
                }
            }
        }
    }

    for (bundle_idx, model_idx, attr_idx) in detached {
        let attribute = &mut bundles[bundle_idx].models[model_idx].attributes[attr_idx];
        if let Some(reference) = attribute.reference.as_mut() {
            reference.state = ReferenceState::Dangling;
        }
    }
}
