//! TOML-based configuration for modlit.
//!
//! Supports a config file (modlit.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [connection]
//! driver = "sqlite"
//! path = "${DATA_DIR}/parcels.gpkg"
//!
//! [filters]
//! schema = "main"
//! include_views = false
//! table_pattern = "gis_*"
//! pattern_syntax = "glob"
//!
//! [naming]
//! strategy = "pascal_singular"
//!
//! [modules]
//! group_by = "prefix"
//! prefix_separator = "_"
//! declared = ["gis", "hr"]
//! allow_empty = true
//!
//! [meta]
//! title = "Parcel Data"
//! slug = "parcels"
//! namespace = "gis"
//! version = "1.0.0"
//!
//! [[types]]
//! native = "citext"
//! kind = "text"
//!
//! [[types]]
//! native = "geometry"
//! kind = "geometry"
//! subtype = "multipolygon"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::connection::ConnectionSettings;
use crate::db::{ReadFilters, TableNamePattern};
use crate::geometry::GeometrySubtype;
use crate::meta::ModelMeta;
use crate::model::NamingStrategy;
use crate::modules::{AssembleOptions, Grouping};
use crate::types::{PrimitiveKind, TypeMapping};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported driver: {0}. Supported: sqlite, catalog_json")]
    UnsupportedDriver(String),

    #[error("Invalid table pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Catalog to read.
    pub connection: Option<ConnectionSettings>,

    /// Table selection.
    pub filters: FilterSettings,

    /// Model naming.
    pub naming: NamingSettings,

    /// Module grouping.
    pub modules: ModuleSettings,

    /// Identity of the synthesized model.
    pub meta: Option<ModelMeta>,

    /// Extra native type mappings.
    pub types: Vec<TypeSettings>,
}

/// Table selection settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Only read this schema.
    pub schema: Option<String>,

    /// Include views.
    pub include_views: bool,

    /// Table name pattern.
    pub table_pattern: Option<String>,

    /// Pattern syntax: "glob" (default) or "regex".
    pub pattern_syntax: Option<String>,
}

impl FilterSettings {
    /// Build reader filters.
    pub fn to_filters(&self) -> Result<ReadFilters, SettingsError> {
        let mut filters = ReadFilters::new().include_views(self.include_views);
        if let Some(schema) = &self.schema {
            filters = filters.schema(schema.clone());
        }

        if let Some(pattern) = &self.table_pattern {
            let syntax = self.pattern_syntax.as_deref().unwrap_or("glob");
            let compiled = match syntax.to_lowercase().as_str() {
                "glob" => TableNamePattern::glob(pattern),
                "regex" => TableNamePattern::regex(pattern),
                other => {
                    return Err(SettingsError::InvalidConfig(format!(
                        "pattern_syntax must be 'glob' or 'regex', got '{}'",
                        other
                    )))
                }
            }
            .map_err(|source| SettingsError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
            filters = filters.pattern(compiled);
        }

        Ok(filters)
    }
}

/// Naming settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NamingSettings {
    /// "pascal" or "pascal_singular".
    pub strategy: String,
}

impl Default for NamingSettings {
    fn default() -> Self {
        Self {
            strategy: "pascal".to_string(),
        }
    }
}

impl NamingSettings {
    pub fn strategy(&self) -> Result<NamingStrategy, SettingsError> {
        NamingStrategy::from_name(&self.strategy).ok_or_else(|| {
            SettingsError::InvalidConfig(format!("unknown naming strategy '{}'", self.strategy))
        })
    }
}

/// Module grouping settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModuleSettings {
    /// "schema" or "prefix".
    pub group_by: String,

    /// Separator for prefix grouping.
    pub prefix_separator: String,

    /// Modules expected to exist.
    pub declared: Vec<String>,

    /// Report empty declared modules instead of failing.
    pub allow_empty: bool,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            group_by: "schema".to_string(),
            prefix_separator: "_".to_string(),
            declared: Vec::new(),
            allow_empty: true,
        }
    }
}

impl ModuleSettings {
    pub fn grouping(&self) -> Result<Grouping, SettingsError> {
        match self.group_by.to_lowercase().as_str() {
            "schema" => Ok(Grouping::Schema),
            "prefix" | "table_prefix" => {
                if self.prefix_separator.is_empty() {
                    return Err(SettingsError::InvalidConfig(
                        "prefix_separator must not be empty".to_string(),
                    ));
                }
                Ok(Grouping::TablePrefix(self.prefix_separator.clone()))
            }
            other => Err(SettingsError::InvalidConfig(format!(
                "group_by must be 'schema' or 'prefix', got '{}'",
                other
            ))),
        }
    }

    pub fn assemble_options(&self) -> AssembleOptions {
        AssembleOptions {
            declared: self.declared.clone(),
            allow_empty: self.allow_empty,
        }
    }
}

/// A `[[types]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TypeSettings {
    /// Native type name as the catalog reports it.
    pub native: String,

    /// Primitive kind name, or "geometry".
    pub kind: String,

    /// Geometry subtype (geometry kinds only).
    #[serde(default)]
    pub subtype: Option<String>,
}

impl TypeSettings {
    /// The mapping this entry registers.
    pub fn mapping(&self) -> Result<TypeMapping, SettingsError> {
        if self.kind.eq_ignore_ascii_case("geometry") {
            let subtype = match &self.subtype {
                Some(name) => Some(GeometrySubtype::from_name(name).ok_or_else(|| {
                    SettingsError::InvalidConfig(format!(
                        "unknown geometry subtype '{}' for native type '{}'",
                        name, self.native
                    ))
                })?),
                None => None,
            };
            return Ok(TypeMapping::geometry(subtype));
        }

        if self.subtype.is_some() {
            return Err(SettingsError::InvalidConfig(format!(
                "subtype is only valid for geometry kinds (native type '{}')",
                self.native
            )));
        }
        PrimitiveKind::from_str(&self.kind)
            .map(TypeMapping::primitive)
            .ok_or_else(|| {
                SettingsError::InvalidConfig(format!(
                    "unknown kind '{}' for native type '{}'",
                    self.kind, self.native
                ))
            })
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `MODLIT_CONFIG`
    /// 2. `./modlit.toml`
    /// 3. `~/.config/modlit/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("MODLIT_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("modlit.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("modlit").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Return defaults if no config file found
        Ok(Settings::default())
    }

    /// Get the configured connection, falling back to `MODLIT_DB_*`
    /// environment variables.
    pub fn connection(&self) -> Result<ConnectionSettings, SettingsError> {
        match &self.connection {
            Some(conn) => Ok(conn.clone()),
            None => ConnectionSettings::from_env(),
        }
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.next_if_eq(&'{').is_some() {
            let name: String = std::iter::from_fn(|| chars.next_if(|&ch| ch != '}')).collect();
            chars.next(); // consume '}'
            name
        } else {
            std::iter::from_fn(|| chars.next_if(|&ch| ch.is_alphanumeric() || ch == '_'))
                .collect()
        };

        if var_name.is_empty() {
            // Just a lone $, keep it
            result.push('$');
            continue;
        }
        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
