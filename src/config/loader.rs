use super::TripleStoreConfig;
use crate::error::ConfigError;

use directories::ProjectDirs;

use std::fs;
use std::path::{Path, PathBuf};

impl TripleStoreConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file, applies environment overrides, then validates.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Self = toml::from_str(&contents)?;
        config.apply_env_overrides();
        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            backend = %config.backend,
            "loaded triple store config"
        );
        Ok(config)
    }

    /// Database directory with `~` expanded, or the platform data directory
    /// when no path is configured.
    pub fn resolved_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = self.path.as_deref().map(str::trim)
            && !path.is_empty()
        {
            return Ok(PathBuf::from(shellexpand::tilde(path).as_ref()));
        }

        ProjectDirs::from("", "", "triple-memory")
            .map(|dirs| dirs.data_dir().join("lancedb"))
            .ok_or_else(|| {
                ConfigError::Validation("could not determine a data directory; set path".into())
            })
    }
}
