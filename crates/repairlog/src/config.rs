//! Configuration management for repairlog.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::render::DEFAULT_TEMPLATE_NAME;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "repairlog";

/// Replacement shown for passwords in displayed configuration.
const REDACTED: &str = "********";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `REPAIRLOG_`, sections split on
///    `__`, e.g. `REPAIRLOG_AUTH__ADMIN_PASSWORD`)
/// 2. TOML config file at `~/.config/repairlog/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Template configuration.
    pub template: TemplateConfig,
    /// Export configuration.
    pub export: ExportConfig,
    /// Account configuration.
    pub auth: AuthConfig,
}

/// Template-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Path to the template artifact.
    /// Defaults to `report_template.txt` in the working directory.
    pub path: Option<PathBuf>,
}

/// Export-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory exported documents are written to.
    pub output_dir: PathBuf,
    /// File name prefix for exported documents.
    pub file_prefix: String,
    /// Append the record date to exported file names.
    pub include_date: bool,
}

/// Account configuration for the role gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Privileged account name.
    pub admin_username: String,
    /// Privileged account password.
    pub admin_password: String,
    /// Unprivileged account name.
    pub user_username: String,
    /// Unprivileged account password. `None` accepts any password.
    pub user_password: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            file_prefix: "Report".to_string(),
            include_date: true,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
            user_username: "user".to_string(),
            user_password: None,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `REPAIRLOG_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("REPAIRLOG_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let auth = &self.auth;
        if auth.admin_username.trim().is_empty() || auth.user_username.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "admin_username and user_username must not be empty".to_string(),
            });
        }

        if auth.admin_username == auth.user_username {
            return Err(Error::ConfigValidation {
                message: format!(
                    "admin_username and user_username must differ (both are '{}')",
                    auth.admin_username
                ),
            });
        }

        if auth.admin_password.is_empty() {
            return Err(Error::ConfigValidation {
                message: "admin_password must not be empty".to_string(),
            });
        }

        let prefix = &self.export.file_prefix;
        if prefix.trim().is_empty() || prefix.contains(['/', '\\']) {
            return Err(Error::ConfigValidation {
                message: format!("invalid file_prefix: '{prefix}'"),
            });
        }

        Ok(())
    }

    /// A copy with every configured password masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.auth.admin_password = REDACTED.to_string();
        if let Some(password) = config.auth.user_password.as_mut() {
            *password = REDACTED.to_string();
        }
        config
    }

    /// Get the template path, resolving defaults if not set.
    #[must_use]
    pub fn template_path(&self) -> PathBuf {
        self.template
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_masks_passwords() {
        let mut config = Config::default();
        config.auth.user_password = Some("hunter2".to_string());

        let redacted = config.redacted();
        assert_eq!(redacted.auth.admin_password, REDACTED);
        assert_eq!(redacted.auth.user_password.as_deref(), Some(REDACTED));
        assert_eq!(redacted.auth.admin_username, "admin");

        let json = serde_json::to_string(&redacted).unwrap();
        assert!(!json.contains("admin123"));
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn test_redacted_keeps_unset_user_password() {
        assert!(Config::default().redacted().auth.user_password.is_none());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.template.path.is_none());
        assert_eq!(config.export.file_prefix, "Report");
        assert!(config.export.include_date);
        assert_eq!(config.auth.admin_username, "admin");
    }

    #[test]
    fn test_default_auth_config() {
        let auth = AuthConfig::default();

        assert_eq!(auth.admin_username, "admin");
        assert_eq!(auth.admin_password, "admin123");
        assert_eq!(auth.user_username, "user");
        assert!(auth.user_password.is_none());
    }

    #[test]
    fn test_default_export_config() {
        let export = ExportConfig::default();

        assert_eq!(export.output_dir, PathBuf::from("."));
        assert_eq!(export.file_prefix, "Report");
        assert!(export.include_date);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_username() {
        let mut config = Config::default();
        config.auth.user_username = " ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("must not be empty"));
    }

    #[test]
    fn test_validate_same_usernames() {
        let mut config = Config::default();
        config.auth.user_username = "admin".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("must differ"));
    }

    #[test]
    fn test_validate_empty_admin_password() {
        let mut config = Config::default();
        config.auth.admin_password = String::new();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("admin_password"));
    }

    #[test]
    fn test_validate_bad_prefix() {
        let mut config = Config::default();
        config.export.file_prefix = "../evil".to_string();
        assert!(config.validate().is_err());

        config.export.file_prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_template_path_default() {
        let config = Config::default();
        assert_eq!(config.template_path(), PathBuf::from(DEFAULT_TEMPLATE_NAME));
    }

    #[test]
    fn test_template_path_custom() {
        let mut config = Config::default();
        config.template.path = Some(PathBuf::from("/srv/templates/report.txt"));

        assert_eq!(
            config.template_path(),
            PathBuf::from("/srv/templates/report.txt")
        );
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("repairlog"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        // Loading from a nonexistent path should work (uses defaults)
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());

        let config = result.unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!(
            "repairlog_config_test_{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "[export]\nfile_prefix = \"Repair\"\ninclude_date = false\n\n[auth]\nuser_password = \"pw\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.export.file_prefix, "Repair");
        assert!(!config.export.include_date);
        assert_eq!(config.auth.user_password.as_deref(), Some("pw"));
        assert_eq!(config.auth.admin_password, "admin123");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_invalid_toml_values_rejected() {
        let path = std::env::temp_dir().join(format!(
            "repairlog_config_invalid_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[auth]\nadmin_password = \"\"\n").unwrap();

        let result = Config::load_from(Some(path.clone()));
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_auth_config_deserialize() {
        let json = r#"{"admin_username": "boss"}"#;
        let auth: AuthConfig = serde_json::from_str(json).unwrap();
        assert_eq!(auth.admin_username, "boss");
        assert_eq!(auth.user_username, "user");
    }

    #[test]
    fn test_export_config_serialize() {
        let export = ExportConfig::default();
        let json = serde_json::to_string(&export).unwrap();
        assert!(json.contains("file_prefix"));
    }
}
