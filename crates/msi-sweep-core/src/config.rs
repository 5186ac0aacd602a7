use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::platform;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Terms that keep an orphaned package out of the actionable list.
    pub exclusion_filters: Vec<String>,
    /// Overrides the installer cache folder (`%windir%\Installer`).
    pub installer_dir: Option<String>,
    pub check_pending_reboot: bool,
    /// When false the exclusion pass only looks at file names.
    pub read_package_metadata: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            exclusion_filters: vec!["Adobe".to_string(), "Acrobat".to_string()],
            installer_dir: None,
            check_pending_reboot: true,
            read_package_metadata: true,
        }
    }
}

impl AppConfig {
    pub fn installer_dir(&self) -> PathBuf {
        match self.installer_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => platform::default_installer_dir(),
        }
    }

    /// Filters with surrounding whitespace removed and blank entries dropped.
    pub fn normalized_filters(&self) -> Vec<String> {
        self.exclusion_filters
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Load `Config.*` from the working directory (optional) layered under
/// `MSI_SWEEP__*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    build(ConfigFile::with_name("Config").required(false))
}

pub fn load_configuration_from(path: &Path) -> Result<AppConfig, ConfigError> {
    build(ConfigFile::from(path).required(true))
}

fn build<S>(file: S) -> Result<AppConfig, ConfigError>
where
    S: config::Source + Send + Sync + 'static,
{
    let builder = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("MSI_SWEEP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("exclusion_filters"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_exclude_adobe_products() {
        let config = AppConfig::default();
        assert_eq!(config.exclusion_filters, vec!["Adobe", "Acrobat"]);
        assert!(config.check_pending_reboot);
        assert!(config.read_package_metadata);
        assert!(config.installer_dir.is_none());
    }

    #[test]
    fn test_normalized_filters_drop_blanks() {
        let config = AppConfig {
            exclusion_filters: vec![
                "  Adobe ".to_string(),
                "".to_string(),
                "   ".to_string(),
                "Office".to_string(),
            ],
            ..AppConfig::default()
        };
        assert_eq!(config.normalized_filters(), vec!["Adobe", "Office"]);
    }

    #[test]
    fn test_installer_dir_override() {
        let config = AppConfig {
            installer_dir: Some(r"D:\Cache\Installer".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(config.installer_dir(), PathBuf::from(r"D:\Cache\Installer"));

        let blank = AppConfig {
            installer_dir: Some("  ".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(blank.installer_dir(), platform::default_installer_dir());
    }

    #[test]
    fn test_load_from_toml_file_keeps_missing_fields_defaulted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Config.toml");
        fs::write(
            &path,
            "exclusion_filters = [\"Contoso\"]\ncheck_pending_reboot = false\n",
        )
        .unwrap();

        let config = load_configuration_from(&path).unwrap();
        assert_eq!(config.exclusion_filters, vec!["Contoso"]);
        assert!(!config.check_pending_reboot);
        assert!(config.read_package_metadata);
    }
}
