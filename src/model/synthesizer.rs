//! Snapshot → model descriptors.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use super::descriptor::{
    AttributeDescriptor, ModelDescriptor, ModelReference, ReferenceState, ResolvedType,
};
use super::naming::NamingStrategy;
use crate::db::{ColumnSpec, SchemaSnapshot, TableSpec};
use crate::errors::{Diagnostic, DiagnosticKind, ModlitError, Result};
use crate::meta::label_for;
use crate::types::TypeRegistry;

/// Output of a synthesis run.
#[derive(Debug, Clone, Serialize)]
pub struct Synthesis {
    /// One descriptor per snapshot table, in snapshot order.
    pub models: Vec<ModelDescriptor>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Synthesis {
    pub fn model(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn model_for_table(&self, schema: &str, table: &str) -> Option<&ModelDescriptor> {
        self.models
            .iter()
            .find(|m| m.schema == schema && m.table == table)
    }
}

/// Builds model descriptors from a schema snapshot.
///
/// Synthesis runs in two passes:
///
/// 1. Every table becomes a descriptor; model names must be unique within a
///    schema, and columns with unregistered native types become opaque
///    attributes (with a warning diagnostic).
/// 2. Foreign-key references are resolved against the descriptors of pass 1.
///    A target with no descriptor leaves the reference dangling (with a
///    warning diagnostic).
///
/// The registry is only read; synthesis of the same snapshot with the same
/// registry is deterministic.
///
/// # Example
///
/// ```ignore
/// let synthesis = Synthesizer::new(TypeRegistry::global())
///     .naming(NamingStrategy::PascalSingular)
///     .synthesize(&snapshot)?;
/// ```
pub struct Synthesizer<'a> {
    registry: &'a TypeRegistry,
    naming: NamingStrategy,
}

impl<'a> Synthesizer<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self {
            registry,
            naming: NamingStrategy::default(),
        }
    }

    pub fn naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    /// Synthesize one descriptor per table of the snapshot.
    ///
    /// # Errors
    ///
    /// [`ModlitError::NameCollision`] if two tables of one schema map to the
    /// same model name. Unknown types and dangling references are reported
    /// as diagnostics, not errors.
    pub fn synthesize(&self, snapshot: &SchemaSnapshot) -> Result<Synthesis> {
        let mut diagnostics = Vec::new();
        let mut names: HashMap<(&str, String), &str> = HashMap::new();
        let mut models = Vec::with_capacity(snapshot.len());

        for table in snapshot.tables() {
            let name = self.naming.model_name(&table.name);
            if let Some(first) = names.insert((table.schema.as_str(), name.clone()), table.name.as_str()) {
                return Err(ModlitError::NameCollision {
                    model: name,
                    first_table: first.to_string(),
                    second_table: table.name.clone(),
                });
            }

            let attributes = table
                .columns
                .iter()
                .map(|column| self.attribute(table, column, &mut diagnostics))
                .collect::<Result<Vec<_>>>()?;

            debug!(table = %table.qualified_name(), model = %name, "synthesized model");
            models.push(ModelDescriptor {
                name,
                schema: table.schema.clone(),
                table: table.name.clone(),
                kind: table.kind,
                attributes,
                unique_constraints: table.unique_constraints.clone(),
            });
        }

        resolve_references(&mut models, &mut diagnostics);

        for diagnostic in &diagnostics {
            diagnostic.trace();
        }
        info!(
            models = models.len(),
            diagnostics = diagnostics.len(),
            "synthesis complete"
        );
        Ok(Synthesis {
            models,
            diagnostics,
        })
    }

    fn attribute(
        &self,
        table: &TableSpec,
        column: &ColumnSpec,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<AttributeDescriptor> {
        let resolved = match self.registry.resolve_column(column) {
            Ok(mapping) => ResolvedType::Mapped { mapping },
            Err(ModlitError::UnknownNativeType {
                native_type,
                column: column_name,
                ..
            }) => {
                diagnostics.push(Diagnostic::downgrade(ModlitError::UnknownNativeType {
                    native_type: native_type.clone(),
                    table: Some(table.name.clone()),
                    column: column_name,
                })?);
                ResolvedType::Opaque { native_type }
            }
            Err(other) => return Err(other),
        };

        let (width, precision, scale) = sizing(column, &resolved);

        Ok(AttributeDescriptor {
            label: label_for(&column.name),
            width,
            precision,
            scale,
            reference: column.foreign_key.clone().map(ModelReference::pending),
            column: column.clone(),
            resolved,
        })
    }
}

/// Width, precision and scale of a column.
///
/// Catalog-reported values win; otherwise they come from the native type
/// parameters (`VARCHAR(80)`, `NUMERIC(10,2)`) when the mapped kind has them.
fn sizing(column: &ColumnSpec, resolved: &ResolvedType) -> (Option<u32>, Option<u32>, Option<u32>) {
    let native = &column.native_type;
    match resolved.mapping().and_then(|m| m.primitive_kind()) {
        Some(kind) if kind.has_width() => (column.max_length.or(native.param(0)), None, None),
        Some(kind) if kind.has_precision() => (
            None,
            column.numeric_precision.or(native.param(0)),
            column.numeric_scale.or(native.param(1)),
        ),
        _ => (column.max_length, column.numeric_precision, column.numeric_scale),
    }
}

fn resolve_references(models: &mut [ModelDescriptor], diagnostics: &mut Vec<Diagnostic>) {
    let index: HashMap<(&str, &str), usize> = models
        .iter()
        .enumerate()
        .map(|(i, m)| ((m.schema.as_str(), m.table.as_str()), i))
        .collect();

    let mut outcomes = Vec::new();
    for (model_idx, model) in models.iter().enumerate() {
        for (attr_idx, attribute) in model.attributes.iter().enumerate() {
            let Some(reference) = &attribute.reference else {
                continue;
            };
            let fk = &reference.target;
            let state = index
                .get(&(fk.schema.as_str(), fk.table.as_str()))
                .map(|&i| &models[i])
                .and_then(|target| {
                    let column = match &fk.column {
                        Some(column) => target.attribute(column),
                        None => match target.primary_key().as_slice() {
                            [only] => Some(*only),
                            _ => None,
                        },
                    }?;
                    Some(ReferenceState::Resolved {
                        model: target.name.clone(),
                        attribute: column.name().to_string(),
                    })
                })
                .unwrap_or(ReferenceState::Dangling);

            if state == ReferenceState::Dangling {
                diagnostics.push(Diagnostic::warning(DiagnosticKind::DanglingReference {
                    table: model.table.clone(),
                    column: attribute.name().to_string(),
                    target: fk.to_string(),
                }));
            }
            outcomes.push((model_idx, attr_idx, state));
        }
    }

    for (model_idx, attr_idx, state) in outcomes {
        if let Some(reference) = models[model_idx].attributes[attr_idx].reference.as_mut() {
            reference.state = state;
        }
    }
}
