//! Semantic attribute types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::GeometrySubtype;

/// Generalized primitive data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    /// Universally-unique identifiers
    Uuid,
    /// Text data (strings, characters, ...)
    Text,
    Integer,
    /// Floating-point values
    Float,
    /// Exact numerics with precision and scale
    Decimal,
    Boolean,
    Date,
    Time,
    /// Date and time
    DateTime,
    Binary,
    Json,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uuid => "uuid",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
            Self::Binary => "binary",
            Self::Json => "json",
        }
    }

    /// Parse a kind name (as used in configuration files).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "uuid" | "guid" => Some(Self::Uuid),
            "text" | "string" => Some(Self::Text),
            "integer" | "int" => Some(Self::Integer),
            "float" | "double" | "real" => Some(Self::Float),
            "decimal" | "numeric" => Some(Self::Decimal),
            "boolean" | "bool" => Some(Self::Boolean),
            "date" => Some(Self::Date),
            "time" => Some(Self::Time),
            "datetime" | "timestamp" => Some(Self::DateTime),
            "binary" | "blob" | "bytes" => Some(Self::Binary),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Check if `width` (character length) applies to this kind.
    pub fn has_width(&self) -> bool {
        matches!(self, Self::Text | Self::Binary)
    }

    /// Check if `precision`/`scale` apply to this kind.
    pub fn has_precision(&self) -> bool {
        matches!(self, Self::Decimal | Self::Float)
    }
}

/// The semantic type of a model attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "kind", rename_all = "snake_case")]
pub enum AttributeType {
    Primitive(PrimitiveKind),
    /// Spatial data; `None` is the generic geometry type.
    Geometry(Option<GeometrySubtype>),
}

/// A registered native-type mapping.
///
/// Mappings are owned by the [`TypeRegistry`](super::TypeRegistry) and
/// shared (`Arc`) by every attribute that resolves to them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeMapping {
    pub attribute_type: AttributeType,
}

impl TypeMapping {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self {
            attribute_type: AttributeType::Primitive(kind),
        }
    }

    pub fn geometry(subtype: Option<GeometrySubtype>) -> Self {
        Self {
            attribute_type: AttributeType::Geometry(subtype),
        }
    }

    pub fn is_geometry(&self) -> bool {
        matches!(self.attribute_type, AttributeType::Geometry(_))
    }

    /// The primitive kind, if this is not a geometry mapping.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.attribute_type {
            AttributeType::Primitive(kind) => Some(kind),
            AttributeType::Geometry(_) => None,
        }
    }
}

impl fmt::Display for TypeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.attribute_type {
            AttributeType::Primitive(kind) => f.write_str(kind.as_str()),
            AttributeType::Geometry(None) => f.write_str("geometry"),
            AttributeType::Geometry(Some(subtype)) => write!(f, "geometry({})", subtype),
        }
    }
}
