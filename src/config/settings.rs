//! Typed view of the effective configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use super::effective::ConfigError;
use crate::batch::{BatchSettings, KEY_FILE_NAME};

/// Subprocess signing provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub command: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

/// Settings consumed by the CLI and the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerSettings {
    pub signed_dir_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,

    pub lock_timeout_seconds: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderSettings>,
}

impl SignerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut components = Path::new(&self.signed_dir_name).components();
        let single = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single {
            return Err(ConfigError::ValidationError(format!(
                "signed_dir_name must be a single path component, got {:?}",
                self.signed_dir_name
            )));
        }

        if !(1..=3600).contains(&self.lock_timeout_seconds) {
            return Err(ConfigError::ValidationError(
                "lock_timeout_seconds must be in [1, 3600]".to_string(),
            ));
        }

        if let Some(provider) = &self.provider {
            if provider.command.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "provider.command must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Configured key path, or the key file next to the running executable
    pub fn key_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.key_file {
            return Ok(path.clone());
        }
        let exe = env::current_exe().map_err(|e| ConfigError::IoError(e.to_string()))?;
        let dir = exe.parent().ok_or_else(|| {
            ConfigError::IoError(format!("executable has no parent: {}", exe.display()))
        })?;
        Ok(dir.join(KEY_FILE_NAME))
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_seconds)
    }

    pub fn batch_settings(&self) -> Result<BatchSettings, ConfigError> {
        Ok(BatchSettings::new(self.key_path()?).with_signed_dir_name(self.signed_dir_name.clone()))
    }
}
