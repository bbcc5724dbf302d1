//! Configuration management for docward
//!
//! Engine settings are merged from several sources, later ones winning:
//! 1. Built-in defaults
//! 2. ~/.config/docward/config.toml (user defaults)
//! 3. docward.toml (project config)
//! 4. docward.local.toml (local overrides, not checked in)
//! 5. Environment variables (`DOCWARD_<SECTION>__<KEY>`)
//!
//! Policy definitions are Rust values handed to the engine builder; they are
//! not part of this file format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::{LOCAL_CONFIG_FILE, PROJECT_CONFIG_FILE, Paths, USER_CONFIG_FILE};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bypass: BypassConfig,
    pub audit: AuditConfig,
    pub membership: MembershipConfig,
}

/// Principals exempt from every document policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BypassConfig {
    pub system_principal: String,
    pub administrator_principal: String,
    /// Extra names treated as administrators.
    pub additional_administrators: Vec<String>,
}

impl Default for BypassConfig {
    fn default() -> Self {
        Self {
            system_principal: "system".to_string(),
            administrator_principal: "Administrator".to_string(),
            additional_administrators: Vec::new(),
        }
    }
}

impl BypassConfig {
    /// Every administrator name, the primary one first.
    pub fn administrators(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.administrator_principal.as_str())
            .chain(self.additional_administrators.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Emit per-decision and per-transform log events.
    pub enabled: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MembershipConfig {
    /// Count a permission check's additional principals as group memberships.
    /// Listing queries never see them, so enabling this lets checks be more
    /// permissive than listings.
    pub use_additional_principals: bool,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            use_additional_principals: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from a specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Read a single TOML file, without merging other sources.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML, e.g. to seed a project `docward.toml`.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Rejects empty principal names and administrator names that collide
    /// with the system principal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bypass.system_principal.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "bypass.system_principal must not be empty".to_string(),
            ));
        }
        for name in self.bypass.administrators() {
            if name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "administrator principal names must not be empty".to_string(),
                ));
            }
            if name == self.bypass.system_principal {
                return Err(ConfigError::ValidationError(format!(
                    "'{name}' is configured as both system and administrator principal"
                )));
            }
        }
        Ok(())
    }
}
