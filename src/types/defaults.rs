//! Built-in native type vocabulary.
//!
//! Covers the type names SQLite, PostgreSQL and the common spatial
//! extensions (SpatiaLite, GeoPackage, PostGIS) report. Anything else must be
//! registered explicitly.

use tracing::warn;

use super::mapping::{PrimitiveKind, TypeMapping};
use super::registry::TypeRegistry;
use crate::geometry::GeometrySubtype;

const PRIMITIVES: &[(PrimitiveKind, &[&str])] = &[
    (PrimitiveKind::Uuid, &["uuid", "guid", "uniqueidentifier"]),
    (
        PrimitiveKind::Text,
        &[
            "text",
            "varchar",
            "char",
            "nchar",
            "nvarchar",
            "character",
            "character varying",
            "varying character",
            "native character",
            "clob",
            "string",
            "citext",
            "name",
        ],
    ),
    (
        PrimitiveKind::Integer,
        &[
            "integer",
            "int",
            "int2",
            "int4",
            "int8",
            "tinyint",
            "smallint",
            "mediumint",
            "bigint",
            "unsigned big int",
            "serial",
            "bigserial",
            "smallserial",
        ],
    ),
    (
        PrimitiveKind::Float,
        &["real", "float", "float4", "float8", "double", "double precision"],
    ),
    (PrimitiveKind::Decimal, &["numeric", "decimal", "money"]),
    (PrimitiveKind::Boolean, &["boolean", "bool"]),
    (PrimitiveKind::Date, &["date"]),
    (
        PrimitiveKind::Time,
        &["time", "time without time zone", "time with time zone", "timetz"],
    ),
    (
        PrimitiveKind::DateTime,
        &[
            "datetime",
            "timestamp",
            "timestamp without time zone",
            "timestamp with time zone",
            "timestamptz",
        ],
    ),
    (PrimitiveKind::Binary, &["blob", "bytea", "binary", "varbinary"]),
    (PrimitiveKind::Json, &["json", "jsonb"]),
];

/// Native names under which generic geometry columns are declared.
const GEOMETRY_NATIVES: &[&str] = &["geometry", "geography", "geom"];

pub(super) fn install(registry: &TypeRegistry) {
    for (kind, names) in PRIMITIVES {
        for name in *names {
            add(registry.register(name, TypeMapping::primitive(*kind)));
        }
    }

    for native in GEOMETRY_NATIVES {
        add(registry.register(native, TypeMapping::geometry(None)));
        for subtype in GeometrySubtype::ALL {
            add(registry.register_geometry(
                native,
                subtype,
                TypeMapping::geometry(Some(subtype)),
            ));
        }
    }

    // SpatiaLite and GeoPackage declare the subtype as the column type itself.
    for subtype in GeometrySubtype::ALL {
        add(registry.register(subtype.as_str(), TypeMapping::geometry(Some(subtype))));
    }
    add(registry.register(
        "geomcollection",
        TypeMapping::geometry(Some(GeometrySubtype::GeometryCollection)),
    ));
}

fn add<T>(result: crate::errors::Result<T>) {
    // The vocabulary above is conflict-free; a failure here means it was edited badly.
    if let Err(err) = result {
        warn!(error = %err, "skipping built-in type mapping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryInfo;
    use crate::types::{AttributeType, NativeType};

    #[test]
    fn test_defaults_cover_common_types() {
        let registry = TypeRegistry::with_defaults();
        for (declared, kind) in [
            ("INTEGER", PrimitiveKind::Integer),
            ("VARCHAR(255)", PrimitiveKind::Text),
            ("NUMERIC(10,2)", PrimitiveKind::Decimal),
            ("double precision", PrimitiveKind::Float),
            ("TIMESTAMP WITH TIME ZONE", PrimitiveKind::DateTime),
            ("uuid", PrimitiveKind::Uuid),
            ("BLOB", PrimitiveKind::Binary),
            ("jsonb", PrimitiveKind::Json),
        ] {
            let mapping = registry.resolve(declared).unwrap();
            assert_eq!(mapping.primitive_kind(), Some(kind), "{}", declared);
        }
    }

    #[test]
    fn test_defaults_geometry() {
        let registry = TypeRegistry::with_defaults();

        let mapping = registry.resolve("MULTIPOLYGON").unwrap();
        assert_eq!(
            mapping.attribute_type,
            AttributeType::Geometry(Some(GeometrySubtype::MultiPolygon))
        );

        let info = GeometryInfo::new(Some(GeometrySubtype::LineString), Some(2056));
        let mapping = registry
            .resolve_native(&NativeType::parse("geometry"), Some(&info))
            .unwrap();
        assert_eq!(
            mapping.attribute_type,
            AttributeType::Geometry(Some(GeometrySubtype::LineString))
        );
    }
}
