//! Integration tests for reading SQLite, SpatiaLite and GeoPackage catalogs.

use modlit::db::{
    read_schema, CatalogSource, ReadFilters, SqliteCatalog, TableKind, TableNamePattern,
};
use modlit::geometry::GeometrySubtype;
use rusqlite::Connection;

fn catalog(ddl: &str) -> SqliteCatalog {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(ddl).unwrap();
    SqliteCatalog::from_connection(conn)
}

const SHOP: &str = "
    CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        note
    );
    CREATE TABLE orders (
        id INTEGER PRIMARY KEY,
        user_id INTEGER REFERENCES users(id),
        total NUMERIC(10,2),
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE order_lines (
        order_id INTEGER NOT NULL REFERENCES orders,
        line_no INTEGER NOT NULL,
        ghost_id INTEGER REFERENCES ghosts,
        PRIMARY KEY (order_id, line_no)
    );
    CREATE VIEW active_users AS SELECT id, email FROM users;
";

#[tokio::test]
async fn test_lists_main_schema_only() {
    let source = catalog(SHOP);
    assert_eq!(source.dialect(), "sqlite");
    assert_eq!(source.list_schemas().await.unwrap(), vec!["main"]);
}

#[tokio::test]
async fn test_tables_and_columns_in_declaration_order() {
    let source = catalog(SHOP);
    let snapshot = read_schema(&source, &ReadFilters::new()).await.unwrap();

    let tables: Vec<_> = snapshot.tables().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tables, vec!["users", "orders", "order_lines"]);

    let orders = snapshot.table("main", "orders").unwrap();
    let columns: Vec<_> = orders.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(columns, vec!["id", "user_id", "total", "created_at"]);
    assert_eq!(orders.columns[2].native_type.name, "numeric");
    assert_eq!(orders.columns[2].native_type.params, vec![10, 2]);
    assert_eq!(orders.columns[3].default.as_deref(), Some("CURRENT_TIMESTAMP"));
    assert_eq!(orders.primary_key_columns(), vec!["id"]);
}

#[tokio::test]
async fn test_typeless_column_is_blob() {
    let source = catalog(SHOP);
    let snapshot = read_schema(&source, &ReadFilters::new()).await.unwrap();

    let note = snapshot.table("main", "users").unwrap().get_column("note").unwrap();
    assert_eq!(note.native_type.name, "blob");
}

#[tokio::test]
async fn test_unique_constraints() {
    let source = catalog(SHOP);
    let snapshot = read_schema(&source, &ReadFilters::new()).await.unwrap();

    let users = snapshot.table("main", "users").unwrap();
    assert_eq!(users.unique_constraints.len(), 1);
    assert_eq!(users.unique_constraints[0].columns, vec!["email"]);
    assert!(!users.get_column("email").unwrap().nullable);
}

#[tokio::test]
async fn test_foreign_keys() {
    let source = catalog(SHOP);
    let snapshot = read_schema(&source, &ReadFilters::new()).await.unwrap();

    let orders = snapshot.table("main", "orders").unwrap();
    let fk = orders.get_column("user_id").unwrap().foreign_key.clone().unwrap();
    assert_eq!((fk.schema.as_str(), fk.table.as_str()), ("main", "users"));
    assert_eq!(fk.column.as_deref(), Some("id"));

    // Implicit parent column resolves to the parent's primary key.
    let lines = snapshot.table("main", "order_lines").unwrap();
    let fk = lines.get_column("order_id").unwrap().foreign_key.clone().unwrap();
    assert_eq!(fk.to_string(), "orders.id");
    assert_eq!(lines.primary_key_columns(), vec!["order_id", "line_no"]);

    // A missing parent stays implicit.
    let fk = lines.get_column("ghost_id").unwrap().foreign_key.clone().unwrap();
    assert_eq!(fk.to_string(), "ghosts.<pk>");
}

#[tokio::test]
async fn test_views_only_when_requested() {
    let source = catalog(SHOP);

    let snapshot = read_schema(&source, &ReadFilters::new()).await.unwrap();
    assert!(snapshot.table("main", "active_users").is_none());

    let snapshot = read_schema(&source, &ReadFilters::new().include_views(true))
        .await
        .unwrap();
    let view = snapshot.table("main", "active_users").unwrap();
    assert_eq!(view.kind, TableKind::View);
    assert_eq!(view.columns.len(), 2);
}

#[tokio::test]
async fn test_glob_and_regex_select_the_same_tables() {
    let source = catalog(SHOP);

    let glob = ReadFilters::new().pattern(TableNamePattern::glob("order*").unwrap());
    let regex = ReadFilters::new().pattern(TableNamePattern::regex("order.*").unwrap());

    let a = read_schema(&source, &glob).await.unwrap();
    let b = read_schema(&source, &regex).await.unwrap();

    assert_eq!(a.len(), 2);
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[tokio::test]
async fn test_geopackage_metadata() {
    let source = catalog(
        "
        CREATE TABLE gpkg_geometry_columns (
            table_name TEXT NOT NULL,
            column_name TEXT NOT NULL,
            geometry_type_name TEXT NOT NULL,
            srs_id INTEGER NOT NULL,
            z TINYINT NOT NULL,
            m TINYINT NOT NULL
        );
        CREATE TABLE gpkg_contents (table_name TEXT PRIMARY KEY);
        CREATE TABLE parcels (
            fid INTEGER PRIMARY KEY AUTOINCREMENT,
            geom MULTIPOLYGON,
            parcel_no TEXT
        );
        INSERT INTO gpkg_geometry_columns VALUES ('parcels', 'geom', 'MULTIPOLYGON', 2056, 1, 0);
        ",
    );
    let snapshot = read_schema(&source, &ReadFilters::new()).await.unwrap();

    // Bookkeeping tables are not part of the schema.
    let tables: Vec<_> = snapshot.tables().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tables, vec!["parcels"]);

    let geom = snapshot.tables()[0].geometry_column().unwrap();
    assert_eq!(geom.name, "geom");
    let info = geom.geometry.as_ref().unwrap();
    assert_eq!(info.subtype, Some(GeometrySubtype::MultiPolygon));
    assert_eq!(info.srid, Some(2056));
    assert_eq!(info.coord_dimension, Some(3));
}

#[tokio::test]
async fn test_spatialite_v4_metadata() {
    let source = catalog(
        "
        CREATE TABLE geometry_columns (
            f_table_name TEXT NOT NULL,
            f_geometry_column TEXT NOT NULL,
            geometry_type INTEGER NOT NULL,
            coord_dimension INTEGER NOT NULL,
            srid INTEGER NOT NULL,
            spatial_index_enabled INTEGER NOT NULL
        );
        CREATE TABLE spatial_ref_sys (srid INTEGER PRIMARY KEY);
        CREATE TABLE roads (id INTEGER PRIMARY KEY, name TEXT, geometry LINESTRING);
        INSERT INTO geometry_columns VALUES ('roads', 'geometry', 1002, 3, 4326, 1);
        ",
    );
    let snapshot = read_schema(&source, &ReadFilters::new()).await.unwrap();
    assert_eq!(snapshot.len(), 1);

    let info = snapshot.tables()[0]
        .get_column("geometry")
        .unwrap()
        .geometry
        .clone()
        .unwrap();
    assert_eq!(info.subtype, Some(GeometrySubtype::LineString));
    assert_eq!(info.srid, Some(4326));
    assert_eq!(info.coord_dimension, Some(3));
}

#[tokio::test]
async fn test_spatialite_legacy_metadata() {
    let source = catalog(
        "
        CREATE TABLE geometry_columns (
            f_table_name VARCHAR(256) NOT NULL,
            f_geometry_column VARCHAR(256) NOT NULL,
            type VARCHAR(30) NOT NULL,
            coord_dimension TEXT NOT NULL,
            srid INTEGER,
            spatial_index_enabled INTEGER NOT NULL
        );
        CREATE TABLE pois (id INTEGER PRIMARY KEY, pt POINT);
        INSERT INTO geometry_columns VALUES ('pois', 'pt', 'POINT', 'XY', 4326, 0);
        ",
    );
    let snapshot = read_schema(&source, &ReadFilters::new()).await.unwrap();

    let info = snapshot.tables()[0].geometry_column().unwrap().geometry.clone().unwrap();
    assert_eq!(info.subtype, Some(GeometrySubtype::Point));
    assert_eq!(info.srid, Some(4326));
    assert_eq!(info.coord_dimension, Some(2));
}

#[tokio::test]
async fn test_spatial_metadata_for_missing_column_is_malformed() {
    let source = catalog(
        "
        CREATE TABLE gpkg_geometry_columns (
            table_name TEXT, column_name TEXT, geometry_type_name TEXT,
            srs_id INTEGER, z TINYINT, m TINYINT
        );
        CREATE TABLE parcels (fid INTEGER PRIMARY KEY);
        INSERT INTO gpkg_geometry_columns VALUES ('parcels', 'geom', 'POLYGON', 4326, 0, 0);
        ",
    );
    let err = read_schema(&source, &ReadFilters::new()).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "malformed catalog metadata at 'parcels.geom': \
         spatial metadata names a column absent from the column list"
    );
}

#[tokio::test]
async fn test_open_missing_file_is_connection_error() {
    let err = SqliteCatalog::open("/nonexistent/dir/modlit.sqlite").err().unwrap();
    assert!(matches!(err, modlit::ModlitError::Connection { .. }));
}

#[tokio::test]
async fn test_plain_sqlite_keeps_extension_like_names() {
    let source = catalog(
        "
        CREATE TABLE idx_scores (id INTEGER PRIMARY KEY, score REAL);
        CREATE TABLE knn (id INTEGER PRIMARY KEY);
        CREATE TABLE data_licenses (id INTEGER PRIMARY KEY, name TEXT);
        CREATE TABLE rtree_regions (id INTEGER PRIMARY KEY);
        ",
    );
    let snapshot = read_schema(&source, &ReadFilters::new()).await.unwrap();

    let tables: Vec<_> = snapshot.tables().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tables, vec!["idx_scores", "knn", "data_licenses", "rtree_regions"]);
}

#[tokio::test]
async fn test_spatial_index_tables_are_skipped() {
    let source = catalog(
        "
        CREATE TABLE geometry_columns (
            f_table_name TEXT NOT NULL,
            f_geometry_column TEXT NOT NULL,
            geometry_type INTEGER NOT NULL,
            coord_dimension INTEGER NOT NULL,
            srid INTEGER NOT NULL,
            spatial_index_enabled INTEGER NOT NULL
        );
        CREATE TABLE roads (id INTEGER PRIMARY KEY, geom LINESTRING);
        CREATE VIRTUAL TABLE idx_roads_geom USING rtree(pkid, xmin, xmax, ymin, ymax);
        CREATE TABLE idx_scores (id INTEGER PRIMARY KEY);
        INSERT INTO geometry_columns VALUES ('roads', 'geom', 2, 2, 4326, 1);
        ",
    );
    let snapshot = read_schema(&source, &ReadFilters::new()).await.unwrap();

    let tables: Vec<_> = snapshot.tables().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tables, vec!["roads", "idx_scores"]);
}

#[tokio::test]
async fn test_unknown_schema_reads_nothing() {
    let source = catalog(SHOP);
    let snapshot = read_schema(&source, &ReadFilters::new().schema("archive"))
        .await
        .unwrap();
    assert!(snapshot.is_empty());
}
