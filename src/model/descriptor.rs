//! Synthesized model descriptors.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::db::{ColumnSpec, ForeignKeyRef, TableKind, UniqueConstraint};
use crate::types::TypeMapping;

/// The semantic type an attribute resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum ResolvedType {
    /// A registered mapping, shared with the registry.
    Mapped { mapping: Arc<TypeMapping> },
    /// No mapping was registered; the native type is carried verbatim.
    Opaque { native_type: String },
}

impl ResolvedType {
    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::Opaque { .. })
    }

    pub fn mapping(&self) -> Option<&Arc<TypeMapping>> {
        match self {
            Self::Mapped { mapping } => Some(mapping),
            Self::Opaque { .. } => None,
        }
    }
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mapped { mapping } => write!(f, "{}", mapping),
            Self::Opaque { native_type } => write!(f, "opaque({})", native_type),
        }
    }
}

/// Resolution state of a [`ModelReference`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReferenceState {
    /// Not resolved yet.
    Pending,
    /// Points at an attribute of a synthesized model.
    Resolved { model: String, attribute: String },
    /// The target has no model (filtered out, absent, or in another bundle).
    Dangling,
}

/// A foreign-key reference from one model attribute to another model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelReference {
    pub target: ForeignKeyRef,
    pub state: ReferenceState,
}

impl ModelReference {
    pub fn pending(target: ForeignKeyRef) -> Self {
        Self {
            target,
            state: ReferenceState::Pending,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, ReferenceState::Resolved { .. })
    }

    pub fn is_dangling(&self) -> bool {
        matches!(self.state, ReferenceState::Dangling)
    }

    /// Name of the model the reference resolved to.
    pub fn model(&self) -> Option<&str> {
        match &self.state {
            ReferenceState::Resolved { model, .. } => Some(model),
            _ => None,
        }
    }
}

/// One attribute of a model, in column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeDescriptor {
    /// The source column.
    pub column: ColumnSpec,
    pub resolved: ResolvedType,
    /// Human-readable label.
    pub label: String,
    /// Character/byte width, for text and binary attributes.
    pub width: Option<u32>,
    /// Total digits, for numeric attributes.
    pub precision: Option<u32>,
    /// Fractional digits, for numeric attributes.
    pub scale: Option<u32>,
    pub reference: Option<ModelReference>,
}

impl AttributeDescriptor {
    /// Attribute name (the column name).
    pub fn name(&self) -> &str {
        &self.column.name
    }

    pub fn is_primary_key(&self) -> bool {
        self.column.primary_key
    }

    pub fn is_opaque(&self) -> bool {
        self.resolved.is_opaque()
    }
}

/// An in-memory model synthesized from one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub schema: String,
    /// Source table name.
    pub table: String,
    pub kind: TableKind,
    pub attributes: Vec<AttributeDescriptor>,
    pub unique_constraints: Vec<UniqueConstraint>,
}

impl ModelDescriptor {
    /// Get an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    /// Primary key attributes, in column order.
    pub fn primary_key(&self) -> Vec<&AttributeDescriptor> {
        self.attributes.iter().filter(|a| a.is_primary_key()).collect()
    }

    /// Attributes carrying a foreign-key reference.
    pub fn references(&self) -> impl Iterator<Item = (&AttributeDescriptor, &ModelReference)> {
        self.attributes
            .iter()
            .filter_map(|a| a.reference.as_ref().map(|r| (a, r)))
    }

    /// The first geometry attribute, if any.
    pub fn geometry_attribute(&self) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.column.is_geometry())
    }

    /// `schema.table`
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}
