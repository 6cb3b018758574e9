//! Catalog reading: raw rows in, [`SchemaSnapshot`] out.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use super::catalog::{CatalogGeometryColumn, CatalogSource, CatalogTableDetail};
use super::filters::ReadFilters;
use super::snapshot::{
    ColumnSpec, ForeignKeyRef, ForeignKeySpec, SchemaSnapshot, TableKind, TableSpec,
    UniqueConstraint,
};
use crate::errors::{ModlitError, Result};
use crate::geometry::GeometrySubtype;

/// Read a schema snapshot from a catalog.
///
/// Tables are kept in catalog order, columns in ordinal order. Foreign keys
/// are kept even when their target is filtered out; resolving them is the
/// synthesizer's job. A schema filter naming a schema the catalog does not
/// have selects nothing.
///
/// # Errors
///
/// - [`ModlitError::Connection`] if the catalog fails.
/// - [`ModlitError::MalformedCatalogMetadata`] if a table or column lacks a
///   name or type, ordinals repeat, a constraint or spatial row names a
///   missing column, or a table is listed twice.
pub async fn read_schema<S>(source: &S, filters: &ReadFilters) -> Result<SchemaSnapshot>
where
    S: CatalogSource + ?Sized,
{
    let mut schemas = source.list_schemas().await?;
    if let Some(wanted) = &filters.schema_name {
        schemas.retain(|schema| schema == wanted);
        if schemas.is_empty() {
            warn!(dialect = source.dialect(), schema = %wanted, "schema not found in catalog");
        }
    }
    debug!(dialect = source.dialect(), ?schemas, "reading catalog");

    let mut tables = Vec::new();
    for schema in &schemas {
        tables.extend(read_one_schema(source, schema, filters).await?);
    }

    let snapshot = SchemaSnapshot::from_tables(tables)?;
    info!(
        dialect = source.dialect(),
        tables = snapshot.len(),
        fingerprint = %snapshot.fingerprint(),
        "read schema snapshot"
    );
    Ok(snapshot)
}

async fn read_one_schema<S>(
    source: &S,
    schema: &str,
    filters: &ReadFilters,
) -> Result<Vec<TableSpec>>
where
    S: CatalogSource + ?Sized,
{
    let mut selected = Vec::new();
    for raw in source.list_tables(schema).await? {
        let name = match raw.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                return Err(ModlitError::malformed(
                    None,
                    None,
                    format!("table without a name in schema '{}'", schema),
                ))
            }
        };
        let kind = TableKind::parse(&raw.table_type).ok_or_else(|| {
            ModlitError::malformed(
                Some(&name),
                None,
                format!("unrecognized table type '{}'", raw.table_type),
            )
        })?;
        if filters.accepts(&name, kind) {
            selected.push((name, kind));
        } else {
            debug!(schema, table = %name, "table skipped by filters");
        }
    }

    let names: Vec<String> = selected.iter().map(|(name, _)| name.clone()).collect();
    let details = source.describe_tables(schema, &names).await?;
    let geometry = source.geometry_columns(schema).await?;

    let mut primary_keys: HashMap<(String, String), Option<Vec<String>>> = names
        .iter()
        .zip(&details)
        .map(|(name, detail)| {
            let pk = Some(detail.primary_key.clone()).filter(|pk| !pk.is_empty());
            ((schema.to_string(), name.clone()), pk)
        })
        .collect();

    let mut tables = Vec::with_capacity(selected.len());
    for ((name, kind), mut detail) in selected.into_iter().zip(details) {
        fill_implicit_targets(source, schema, &mut detail, &mut primary_keys).await?;
        let table = normalize_table(schema, name, kind, detail, &geometry)?;
        debug!(
            table = %table.qualified_name(),
            columns = table.columns.len(),
            foreign_keys = table.foreign_keys.len(),
            "read table"
        );
        tables.push(table);
    }
    Ok(tables)
}

/// Replace implicit foreign-key targets with the target's primary key.
///
/// Targets that don't exist or have no primary key stay implicit.
async fn fill_implicit_targets<S>(
    source: &S,
    schema: &str,
    detail: &mut CatalogTableDetail,
    primary_keys: &mut HashMap<(String, String), Option<Vec<String>>>,
) -> Result<()>
where
    S: CatalogSource + ?Sized,
{
    for fk in &mut detail.foreign_keys {
        if !fk.referenced_columns.is_empty() {
            continue;
        }
        let Some(target) = fk.referenced_table.clone() else {
            continue;
        };
        let target_schema = fk.referenced_schema.clone().unwrap_or_else(|| schema.to_string());
        let key = (target_schema, target);
        if !primary_keys.contains_key(&key) {
            let pk = source.primary_key(&key.0, &key.1).await?;
            primary_keys.insert(key.clone(), pk);
        }
        if let Some(Some(pk)) = primary_keys.get(&key) {
            fk.referenced_columns = pk.clone();
        }
    }
    Ok(())
}

fn normalize_table(
    schema: &str,
    name: String,
    kind: TableKind,
    detail: CatalogTableDetail,
    geometry: &[CatalogGeometryColumn],
) -> Result<TableSpec> {
    let table = Some(name.as_str());
    let mut raw_columns = detail.columns;

    let positioned = raw_columns.iter().filter(|c| c.position.is_some()).count();
    if positioned > 0 && positioned < raw_columns.len() {
        return Err(ModlitError::malformed(
            table,
            None,
            "ordinal positions reported for some columns only",
        ));
    }
    if positioned > 0 {
        let mut seen = HashSet::new();
        for column in &raw_columns {
            if let Some(position) = column.position {
                if !seen.insert(position) {
                    return Err(ModlitError::malformed(
                        table,
                        column.name.as_deref(),
                        format!("ordinal position {} reported twice", position),
                    ));
                }
            }
        }
        raw_columns.sort_by_key(|c| c.position);
    }

    let mut columns = Vec::with_capacity(raw_columns.len());
    for (i, raw) in raw_columns.into_iter().enumerate() {
        let column_name = match raw.name {
            Some(n) if !n.trim().is_empty() => n,
            _ => {
                return Err(ModlitError::malformed(
                    table,
                    None,
                    format!("column {} has no name", i + 1),
                ))
            }
        };
        let data_type = match raw.data_type {
            Some(t) if !t.trim().is_empty() => t,
            _ => {
                return Err(ModlitError::malformed(
                    table,
                    Some(&column_name),
                    "column has no native type",
                ))
            }
        };

        let mut column = ColumnSpec::new(column_name, &data_type);
        column.position = raw.position.unwrap_or(i as u32 + 1);
        column.nullable = raw.is_nullable;
        column.default = raw.default_value;
        column.max_length = raw.max_length;
        column.numeric_precision = raw.numeric_precision;
        column.numeric_scale = raw.numeric_scale;
        columns.push(column);
    }

    let absent = |column: &str, what: &str| {
        ModlitError::malformed(
            table,
            Some(column),
            format!("{} names a column absent from the column list", what),
        )
    };

    for pk in &detail.primary_key {
        let column = columns
            .iter_mut()
            .find(|c| &c.name == pk)
            .ok_or_else(|| absent(pk, "primary key"))?;
        column.primary_key = true;
    }

    let mut foreign_keys = Vec::with_capacity(detail.foreign_keys.len());
    for fk in detail.foreign_keys {
        let target_table = fk.referenced_table.filter(|t| !t.is_empty()).ok_or_else(|| {
            ModlitError::malformed(
                table,
                fk.columns.first().map(String::as_str),
                "foreign key without a target table",
            )
        })?;
        let target_schema = fk.referenced_schema.unwrap_or_else(|| schema.to_string());

        for (idx, source_column) in fk.columns.iter().enumerate() {
            let column = columns
                .iter_mut()
                .find(|c| &c.name == source_column)
                .ok_or_else(|| absent(source_column, "foreign key"))?;
            // A column in several foreign keys keeps the first one.
            if column.foreign_key.is_none() {
                column.foreign_key = Some(ForeignKeyRef {
                    schema: target_schema.clone(),
                    table: target_table.clone(),
                    column: fk.referenced_columns.get(idx).cloned(),
                });
            }
        }

        foreign_keys.push(ForeignKeySpec {
            name: fk.name,
            columns: fk.columns,
            target_schema,
            target_table,
            target_columns: fk.referenced_columns,
        });
    }

    for row in geometry.iter().filter(|g| g.table.eq_ignore_ascii_case(&name)) {
        let column = columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(&row.column))
            .ok_or_else(|| absent(&row.column, "spatial metadata"))?;

        let mut info = column.geometry.take().unwrap_or_default();
        if let Some(subtype) = row.geometry_type.as_deref().and_then(GeometrySubtype::from_name) {
            info.subtype = Some(subtype);
        }
        if row.srid.is_some() {
            info.srid = row.srid;
        }
        if row.coord_dimension.is_some() {
            info.coord_dimension = row.coord_dimension;
        }
        column.geometry = Some(info);
    }

    let unique_constraints = detail
        .unique_constraints
        .into_iter()
        .map(|u| UniqueConstraint {
            name: u.name,
            columns: u.columns,
        })
        .collect();

    Ok(TableSpec {
        schema: schema.to_string(),
        name,
        kind,
        columns,
        unique_constraints,
        foreign_keys,
    })
}
