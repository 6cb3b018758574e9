//! Catalog connection configuration.
//!
//! Supports configuration via environment variables:
//! - `MODLIT_DB_DRIVER`: Catalog driver (sqlite, catalog_json)
//! - `MODLIT_DB_PATH`: Database file or catalog dump path

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::settings::{expand_env_vars, SettingsError};

/// Supported catalog drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    /// SQLite, SpatiaLite or GeoPackage file
    Sqlite,
    /// JSON catalog dump
    CatalogJson,
}

impl Driver {
    /// Parse driver from string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, SettingsError> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "spatialite" | "gpkg" | "geopackage" => Ok(Driver::Sqlite),
            "catalog_json" | "json" | "static" => Ok(Driver::CatalogJson),
            other => Err(SettingsError::UnsupportedDriver(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Sqlite => "sqlite",
            Driver::CatalogJson => "catalog_json",
        }
    }
}

/// The `[connection]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionSettings {
    /// Catalog driver (sqlite, catalog_json).
    pub driver: String,

    /// Database file or dump path (supports ${ENV_VAR} expansion).
    pub path: String,
}

impl ConnectionSettings {
    pub fn new(driver: Driver, path: impl Into<String>) -> Self {
        Self {
            driver: driver.as_str().to_string(),
            path: path.into(),
        }
    }

    /// Load the connection from environment variables.
    ///
    /// Both `MODLIT_DB_DRIVER` and `MODLIT_DB_PATH` are required.
    pub fn from_env() -> Result<Self, SettingsError> {
        let driver = env::var("MODLIT_DB_DRIVER")
            .map_err(|_| SettingsError::MissingEnvVar("MODLIT_DB_DRIVER".to_string()))?;
        let path = env::var("MODLIT_DB_PATH")
            .map_err(|_| SettingsError::MissingEnvVar("MODLIT_DB_PATH".to_string()))?;

        Ok(Self::new(Driver::from_str(&driver)?, path))
    }

    /// Get the driver type.
    pub fn driver_type(&self) -> Result<Driver, SettingsError> {
        Driver::from_str(&self.driver)
    }

    /// Get the path with environment variables expanded.
    pub fn resolved_path(&self) -> Result<PathBuf, SettingsError> {
        expand_env_vars(&self.path).map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_parsing() {
        assert_eq!(Driver::from_str("sqlite").unwrap(), Driver::Sqlite);
        assert_eq!(Driver::from_str("GPKG").unwrap(), Driver::Sqlite);
        assert_eq!(Driver::from_str("catalog_json").unwrap(), Driver::CatalogJson);
        assert!(matches!(
            Driver::from_str("mssql"),
            Err(SettingsError::UnsupportedDriver(ref d)) if d == "mssql"
        ));
    }

    #[test]
    fn test_resolved_path() {
        env::set_var("MODLIT_TEST_DATA_DIR", "/srv/data");
        let conn = ConnectionSettings::new(Driver::Sqlite, "${MODLIT_TEST_DATA_DIR}/parcels.gpkg");
        assert_eq!(
            conn.resolved_path().unwrap(),
            PathBuf::from("/srv/data/parcels.gpkg")
        );
        env::remove_var("MODLIT_TEST_DATA_DIR");
    }
}
