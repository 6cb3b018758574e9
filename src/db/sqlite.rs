//! SQLite catalog driver.
//!
//! Reads the catalog through the `pragma_*` table-valued functions, and
//! spatial metadata from SpatiaLite (`geometry_columns`, both the integer
//! layout of 4.x and the older textual one) or GeoPackage
//! (`gpkg_geometry_columns`). Attached databases appear as schemas.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OpenFlags};
use tracing::debug;

use super::catalog::{
    CatalogColumn, CatalogForeignKey, CatalogGeometryColumn, CatalogSource, CatalogTable,
    CatalogTableDetail, CatalogUnique,
};
use crate::errors::{ModlitError, Result};
use crate::geometry::{parse_coord_dimension, GeometrySubtype};

/// Bookkeeping tables created by SpatiaLite.
const SPATIALITE_METADATA_TABLES: &[&str] = &[
    "geometry_columns",
    "geometry_columns_auth",
    "geometry_columns_field_infos",
    "geometry_columns_statistics",
    "geometry_columns_time",
    "spatial_ref_sys",
    "spatial_ref_sys_aux",
    "spatialite_history",
    "sql_statements_log",
    "views_geometry_columns",
    "views_geometry_columns_auth",
    "views_geometry_columns_field_infos",
    "views_geometry_columns_statistics",
    "virts_geometry_columns",
    "virts_geometry_columns_auth",
    "virts_geometry_columns_field_infos",
    "virts_geometry_columns_statistics",
    "data_licenses",
    "spatialindex",
    "elementarygeometries",
    "knn",
    "knn2",
];

/// Shadow tables SQLite creates for every R*Tree virtual table.
const RTREE_SHADOW_SUFFIXES: &[&str] = &["_node", "_parent", "_rowid"];

/// The spatial extensions present in one schema.
///
/// Decides which tables are extension bookkeeping. Names are only reserved
/// when the extension that owns them is actually present, so a plain SQLite
/// file keeps every table that does not start with `sqlite_`.
#[derive(Debug, Default)]
struct SpatialLayout {
    spatialite: bool,
    geopackage: bool,
    /// Lowercase `idx_<table>_<column>` / `rtree_<table>_<column>` names.
    spatial_indexes: Vec<String>,
    columns: Vec<CatalogGeometryColumn>,
}

impl SpatialLayout {
    fn read(conn: &Connection, schema: &str) -> rusqlite::Result<Self> {
        let quoted = quote_identifier(schema);
        let mut stmt = conn.prepare(&format!(
            "SELECT name FROM {}.sqlite_master WHERE type = 'table' \
             AND name IN ('geometry_columns', 'gpkg_geometry_columns', 'gpkg_contents')",
            quoted
        ))?;
        let present = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut layout = Self {
            spatialite: present.iter().any(|t| t == "geometry_columns"),
            geopackage: present.iter().any(|t| t.starts_with("gpkg_")),
            ..Default::default()
        };

        if present.iter().any(|t| t == "gpkg_geometry_columns") {
            let rows = read_geopackage(conn, &quoted)?;
            layout.spatial_indexes.extend(rows.iter().map(|r| index_name("rtree", r)));
            layout.columns.extend(rows);
        }
        if layout.spatialite {
            let rows = read_spatialite(conn, schema, &quoted)?;
            layout.spatial_indexes.extend(rows.iter().map(|r| index_name("idx", r)));
            layout.columns.extend(rows);
        }
        Ok(layout)
    }

    fn is_internal(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        if lower.starts_with("sqlite_") {
            return true;
        }
        if self.geopackage && lower.starts_with("gpkg_") {
            return true;
        }
        if self.spatialite && SPATIALITE_METADATA_TABLES.contains(&lower.as_str()) {
            return true;
        }
        self.spatial_indexes.iter().any(|index| {
            lower == *index
                || lower
                    .strip_prefix(index.as_str())
                    .map_or(false, |rest| RTREE_SHADOW_SUFFIXES.contains(&rest))
        })
    }
}

fn index_name(prefix: &str, column: &CatalogGeometryColumn) -> String {
    format!("{}_{}_{}", prefix, column.table, column.column).to_lowercase()
}

/// Quote an identifier for interpolation into SQL.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A SQLite (or SpatiaLite / GeoPackage) database.
///
/// Queries run on the blocking thread pool; the connection is shared behind
/// a mutex, so concurrent calls are serialized.
#[derive(Clone)]
pub struct SqliteCatalog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalog {
    /// Open a database file read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(|e| ModlitError::connection(format!("opening {}", path.display()), e))?;
        debug!(path = %path.display(), "opened sqlite catalog");
        Ok(Self::from_connection(conn))
    }

    /// Wrap an existing connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    async fn with_conn<T, F>(&self, context: String, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&guard)
        })
        .await
        .map_err(|e| ModlitError::connection(context.clone(), e))?
        .map_err(|e| ModlitError::connection(context, e))
    }
}

#[async_trait]
impl CatalogSource for SqliteCatalog {
    fn dialect(&self) -> &str {
        "sqlite"
    }

    async fn list_schemas(&self) -> Result<Vec<String>> {
        self.with_conn("listing schemas".to_string(), |conn| {
            let mut stmt = conn.prepare("SELECT name FROM pragma_database_list ORDER BY seq")?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(names.into_iter().filter(|name| name != "temp").collect())
        })
        .await
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<CatalogTable>> {
        let owned = schema.to_string();
        let (tables, skipped) = self
            .with_conn(format!("listing tables of '{}'", schema), move |conn| {
                let layout = SpatialLayout::read(conn, &owned)?;
                let mut stmt = conn.prepare(&format!(
                    "SELECT name, type FROM {}.sqlite_master \
                     WHERE type IN ('table', 'view') ORDER BY rowid",
                    quote_identifier(&owned)
                ))?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((row.get::<_, Option<String>>(0)?, row.get::<_, String>(1)?))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                let (skipped, tables): (Vec<_>, Vec<_>) = rows.into_iter().partition(|(name, _)| {
                    name.as_deref().map_or(false, |n| layout.is_internal(n))
                });
                Ok((tables, skipped))
            })
            .await?;

        for (name, _) in &skipped {
            debug!(schema, table = name.as_deref().unwrap_or(""), "skipping extension table");
        }

        Ok(tables
            .into_iter()
            .map(|(name, table_type)| CatalogTable {
                name,
                table_type: table_type.to_uppercase(),
            })
            .collect())
    }

    async fn describe_table(&self, schema: &str, table: &str) -> Result<CatalogTableDetail> {
        let schema = schema.to_string();
        let table = table.to_string();
        let context = format!("describing '{}.{}'", schema, table);

        self.with_conn(context, move |conn| {
            let mut detail = CatalogTableDetail::default();

            let mut stmt = conn.prepare(
                "SELECT cid, name, type, \"notnull\", dflt_value, pk, hidden \
                 FROM pragma_table_xinfo(?1, ?2) ORDER BY cid",
            )?;
            let rows = stmt
                .query_map(params![table, schema], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut pk: Vec<(i64, String)> = Vec::new();
            for (cid, name, data_type, not_null, default_value, pk_index, hidden) in rows {
                // Hidden columns of virtual tables.
                if hidden == 1 {
                    continue;
                }
                if pk_index > 0 {
                    if let Some(name) = &name {
                        pk.push((pk_index, name.clone()));
                    }
                }
                // SQLite allows columns without a declared type; they have BLOB affinity.
                let data_type = data_type
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| "BLOB".to_string());
                detail.columns.push(CatalogColumn {
                    name,
                    position: Some(cid as u32 + 1),
                    data_type: Some(data_type),
                    is_nullable: !not_null,
                    default_value,
                    ..Default::default()
                });
            }
            pk.sort();
            detail.primary_key = pk.into_iter().map(|(_, name)| name).collect();

            let mut stmt = conn.prepare(
                "SELECT id, \"table\", \"from\", \"to\" \
                 FROM pragma_foreign_key_list(?1, ?2) ORDER BY id, seq",
            )?;
            let rows = stmt
                .query_map(params![table, schema], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut grouped: BTreeMap<i64, CatalogForeignKey> = BTreeMap::new();
            for (id, target, from, to) in rows {
                let fk = grouped.entry(id).or_insert_with(|| CatalogForeignKey {
                    referenced_table: target,
                    ..Default::default()
                });
                fk.columns.push(from);
                if let Some(to) = to {
                    fk.referenced_columns.push(to);
                }
            }
            // Foreign keys come back in reverse declaration order.
            detail.foreign_keys = grouped.into_values().rev().collect();

            let mut stmt = conn.prepare(
                "SELECT name, origin FROM pragma_index_list(?1, ?2) \
                 WHERE \"unique\" = 1 AND origin <> 'pk' ORDER BY seq",
            )?;
            let indexes = stmt
                .query_map(params![table, schema], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut stmt = conn.prepare(
                "SELECT name FROM pragma_index_info(?1, ?2) ORDER BY seqno",
            )?;
            for (index, origin) in indexes {
                let columns = stmt
                    .query_map(params![index, schema], |row| row.get::<_, Option<String>>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                // Expression indexes have no column names.
                let Some(columns) = columns.into_iter().collect::<Option<Vec<_>>>() else {
                    continue;
                };
                let name = (origin == "c").then_some(index);
                detail.unique_constraints.push(CatalogUnique { name, columns });
            }

            Ok(detail)
        })
        .await
    }

    async fn geometry_columns(&self, schema: &str) -> Result<Vec<CatalogGeometryColumn>> {
        let schema = schema.to_string();
        let context = format!("reading spatial metadata of '{}'", schema);

        self.with_conn(context, move |conn| {
            SpatialLayout::read(conn, &schema).map(|layout| layout.columns)
        })
        .await
    }
}

fn read_geopackage(conn: &Connection, schema: &str) -> rusqlite::Result<Vec<CatalogGeometryColumn>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT table_name, column_name, geometry_type_name, srs_id, z, m \
         FROM {}.gpkg_geometry_columns",
        schema
    ))?;
    let rows = stmt
        .query_map([], |row| {
            // z and m: 0 = prohibited, 1 = mandatory, 2 = optional
            let z: i64 = row.get(4)?;
            let m: i64 = row.get(5)?;
            Ok(CatalogGeometryColumn {
                table: row.get(0)?,
                column: row.get(1)?,
                geometry_type: row.get(2)?,
                srid: row.get(3)?,
                coord_dimension: Some(2 + u8::from(z == 1) + u8::from(m == 1)),
            })
        })?
        .collect();
    rows
}

fn read_spatialite(
    conn: &Connection,
    schema: &str,
    quoted: &str,
) -> rusqlite::Result<Vec<CatalogGeometryColumn>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('geometry_columns', ?1)")?;
    let columns = stmt
        .query_map([schema], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    // 4.x stores integer codes in geometry_type; older layouts a name in type.
    let type_column = if columns.iter().any(|c| c == "geometry_type") {
        "geometry_type"
    } else {
        "type"
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT f_table_name, f_geometry_column, {}, coord_dimension, srid \
         FROM {}.geometry_columns",
        type_column, quoted
    ))?;
    let rows = stmt
        .query_map([], |row| {
            let geometry_type: Value = row.get(2)?;
            let dimension: Value = row.get(3)?;
            let (geometry_type, coord_dimension) = decode_spatialite_type(&geometry_type, &dimension);
            Ok(CatalogGeometryColumn {
                table: row.get(0)?,
                column: row.get(1)?,
                geometry_type,
                srid: row.get(4)?,
                coord_dimension,
            })
        })?
        .collect();
    rows
}

fn decode_spatialite_type(geometry_type: &Value, dimension: &Value) -> (Option<String>, Option<u8>) {
    let dims = match dimension {
        Value::Integer(n) => u8::try_from(*n).ok(),
        Value::Text(text) => parse_coord_dimension(text),
        _ => None,
    };
    match geometry_type {
        Value::Integer(code) => match GeometrySubtype::from_code(*code) {
            Some((subtype, code_dims)) => (
                Some(subtype.map_or("GEOMETRY", |s| s.as_str()).to_uppercase()),
                dims.or(Some(code_dims)),
            ),
            None => (None, dims),
        },
        Value::Text(name) => (Some(name.clone()), dims),
        _ => (None, dims),
    }
}
