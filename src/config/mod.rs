//! Configuration module for modlit.
//!
//! Handles connection configuration, environment variables, and settings.

mod connection;
mod settings;

pub use connection::{ConnectionSettings, Driver};
pub use settings::{
    expand_env_vars, FilterSettings, ModuleSettings, NamingSettings, Settings, SettingsError,
    TypeSettings,
};
