use crate::domain::{
    config::DeploymentConfig,
    error::{WeldLinkError, WeldLinkResult},
};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration manager
///
/// Loads the deployment configuration from the user's config directory,
/// falling back to built-in defaults when no file exists. A missing
/// file is normal for a freshly installed host; a file that fails to
/// parse is an error, never silently ignored.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> WeldLinkResult<Self> {
        Ok(Self {
            config_path: Self::default_config_path()?,
        })
    }

    /// Manager bound to an explicit config file
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Load the deployment configuration, or defaults if absent
    pub fn load_config(&self) -> WeldLinkResult<DeploymentConfig> {
        if !self.config_path.exists() {
            return Ok(DeploymentConfig::default());
        }
        Self::load_config_from_path(&self.config_path)
    }

    /// Save the deployment configuration
    pub fn save_config(&self, config: &DeploymentConfig) -> WeldLinkResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| WeldLinkError::Config {
                message: format!("Failed to create config directory: {}", e),
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| WeldLinkError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(&self.config_path, content).map_err(|e| WeldLinkError::Config {
            message: format!(
                "Failed to write config file {}: {}",
                self.config_path.display(),
                e
            ),
        })
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(path: &Path) -> WeldLinkResult<DeploymentConfig> {
        let content = fs::read_to_string(path).map_err(|e| WeldLinkError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| WeldLinkError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    fn default_config_path() -> WeldLinkResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| WeldLinkError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join("weldlink").join("config.toml"))
    }
}
