//! # Ledger Configuration
//!
//! Where the database lives and which ledger allowances are on.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SHADE_DB_PATH=/srv/shade/ledger.db                                 │
//! │     SHADE_ALLOW_NEGATIVE_STOCK=false                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/shade-pos/shade.toml (Linux)                             │
//! │     ~/Library/Application Support/com.shade.pos/shade.toml (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     ledger.db next to the config, permissive policy                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # shade.toml
//! [database]
//! path = "/srv/shade/ledger.db"
//! max_connections = 5
//!
//! [policy]
//! allow_negative_stock = true
//! allow_overpayment = false
//! return_edit_window_hours = 12
//! ```

use serde::{Deserialize, Serialize};
use shade_core::LedgerPolicy;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Created on first connect.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "shade", "pos")
        .map(|dirs| dirs.data_dir().join("ledger.db"))
        .unwrap_or_else(|| PathBuf::from("ledger.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

// =============================================================================
// Ledger Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub policy: LedgerPolicy,
}

impl LedgerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (shade.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a config file without applying environment overrides.
    pub fn from_file(path: &Path) -> DbResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DbError::Config(format!("reading {}: {}", path.display(), e)))?;
        toml::from_str(&contents)
            .map_err(|e| DbError::Config(format!("parsing {}: {}", path.display(), e)))
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> DbResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| DbError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DbError::Config(e.to_string()))?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| DbError::Config(e.to_string()))?;
        std::fs::write(&path, contents).map_err(|e| DbError::Config(e.to_string()))?;

        info!(?path, "Ledger config saved");
        Ok(())
    }

    pub fn validate(&self) -> DbResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(DbError::Config("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(DbError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(DbError::Config(
                "database.min_connections must not exceed max_connections".into(),
            ));
        }

        self.policy
            .validate()
            .map_err(|e| DbError::Config(format!("policy: {}", e)))
    }

    /// Pool configuration for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs))
            .policy(self.policy.clone())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("SHADE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("SHADE_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(m) => self.database.max_connections = m,
                Err(_) => warn!(value = %max, "Ignoring invalid SHADE_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(flag) = lookup("SHADE_ALLOW_NEGATIVE_STOCK") {
            match parse_flag(&flag) {
                Some(b) => self.policy.allow_negative_stock = b,
                None => warn!(value = %flag, "Ignoring invalid SHADE_ALLOW_NEGATIVE_STOCK"),
            }
        }

        if let Some(flag) = lookup("SHADE_ALLOW_OVERPAYMENT") {
            match parse_flag(&flag) {
                Some(b) => self.policy.allow_overpayment = b,
                None => warn!(value = %flag, "Ignoring invalid SHADE_ALLOW_OVERPAYMENT"),
            }
        }

        if let Some(hours) = lookup("SHADE_RETURN_EDIT_WINDOW_HOURS") {
            match hours.parse::<i64>() {
                Ok(h) => self.policy.return_edit_window_hours = h,
                Err(_) => warn!(value = %hours, "Ignoring invalid SHADE_RETURN_EDIT_WINDOW_HOURS"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "shade", "pos")
            .map(|dirs| dirs.config_dir().join("shade.toml"))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert!(config.policy.allow_negative_stock);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config: LedgerConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/shade.db"

            [policy]
            allow_overpayment = false
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/shade.db"));
        assert_eq!(config.database.max_connections, 5);
        assert!(config.policy.allow_negative_stock);
        assert!(!config.policy.allow_overpayment);
        assert_eq!(config.policy.return_edit_window_hours, 12);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SHADE_DB_PATH", "/data/ledger.db"),
            ("SHADE_DB_MAX_CONNECTIONS", "8"),
            ("SHADE_ALLOW_NEGATIVE_STOCK", "off"),
            ("SHADE_ALLOW_OVERPAYMENT", "maybe"),
            ("SHADE_RETURN_EDIT_WINDOW_HOURS", "24"),
        ]
        .into_iter()
        .collect();

        let mut config = LedgerConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/data/ledger.db"));
        assert_eq!(config.database.max_connections, 8);
        assert!(!config.policy.allow_negative_stock);
        // invalid value leaves the default alone
        assert!(config.policy.allow_overpayment);
        assert_eq!(config.policy.return_edit_window_hours, 24);
    }

    #[test]
    fn test_validation() {
        let mut config = LedgerConfig::default();
        config.database.max_connections = 0;
        assert!(matches!(config.validate(), Err(DbError::Config(_))));

        let mut config = LedgerConfig::default();
        config.policy.return_edit_window_hours = -5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!("shade-config-{}.toml", uuid::Uuid::new_v4()));
        let mut config = LedgerConfig::default();
        config.database.path = PathBuf::from("/tmp/roundtrip.db");
        config.policy.allow_overpayment = false;

        config.save(Some(path.clone())).unwrap();
        let loaded = LedgerConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }
}
