//! Runtime configuration
//!
//! Both values are owned by the deployment: the administrator allow-list
//! and the location of the catalog document.

use crate::error::ConfigError;
use crate::gate::{AdminSet, UserId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable holding the comma-separated administrator ids
pub const ADMIN_IDS_VAR: &str = "ADMIN_IDS";

/// Environment variable overriding the catalog location
pub const DATA_FILE_VAR: &str = "MATBOT_DATA_FILE";

/// Default catalog location
pub const DEFAULT_DATA_FILE: &str = "materials.json";

/// matbot configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Administrator allow-list
    pub admins: AdminSet,
    /// Catalog document path
    pub data_file: PathBuf,
}

impl BotConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from the process environment
    ///
    /// An unset `ADMIN_IDS` means no administrators.
    ///
    /// # Errors
    /// `ConfigError::InvalidAdminId` if `ADMIN_IDS` holds a non-integer entry
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// # Errors
    /// `ConfigError::InvalidAdminId` if the admin list is malformed
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let admins = match lookup(ADMIN_IDS_VAR) {
            Some(list) => AdminSet::parse_list(&list, ADMIN_IDS_VAR)?,
            None => AdminSet::new(),
        };
        let data_file = lookup(DATA_FILE_VAR)
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_DATA_FILE), PathBuf::from);

        Ok(Self { admins, data_file })
    }

    /// With administrator set
    #[inline]
    #[must_use]
    pub fn with_admins(mut self, admins: impl IntoIterator<Item = UserId>) -> Self {
        self.admins = admins.into_iter().collect();
        self
    }

    /// With catalog path
    #[inline]
    #[must_use]
    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = path.into();
        self
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            admins: AdminSet::new(),
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
        }
    }
}
