//! Vault-level configuration, read from `.vaultlink.toml`.
//!
//! ```toml
//! [links]
//! mentions = true
//!
//! [read]
//! normalize = false
//!
//! [banner]
//! require_behavior = false
//!
//! [vault]
//! ignore = ["Templates"]
//! ```
//!
//! Every section and key is optional. Unknown keys are rejected so that a
//! typo does not silently fall back to a default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::banner::BannerOptions;
use crate::error::{Result, VaultlinkError};
use crate::pipeline::PipelineOptions;

/// Config file looked up at the vault root.
pub const CONFIG_FILE_NAME: &str = ".vaultlink.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultlinkConfig {
    pub links: LinksConfig,
    pub read: ReadConfig,
    pub banner: BannerConfig,
    pub vault: VaultConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinksConfig {
    /// Rewrite backticked and quoted `*.md` path mentions.
    pub mentions: bool,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self { mentions: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadConfig {
    /// Normalize links in the text returned by reads.
    pub normalize: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BannerConfig {
    pub require_behavior: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultConfig {
    /// Directory names skipped in listings, in addition to hidden ones.
    pub ignore: Vec<String>,
}

impl VaultlinkConfig {
    /// Parse a TOML config document.
    ///
    /// # Errors
    ///
    /// Returns [`VaultlinkError::Config`] for invalid TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| VaultlinkError::Config(e.to_string()))
    }

    /// Load a config file.
    ///
    /// # Errors
    ///
    /// Returns [`VaultlinkError::Io`] if the file cannot be read and
    /// [`VaultlinkError::Config`] if it does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| VaultlinkError::Config(format!("{}: {e}", path.display())))
    }

    /// Load `<vault>/.vaultlink.toml`, or defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Fails like [`VaultlinkConfig::load`] when the file exists.
    pub fn load_for_vault(vault_root: &Path) -> Result<Self> {
        let path = Self::path_for_vault(vault_root);
        if path.is_file() {
            debug!(path = %path.display(), "loading vault config");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    #[must_use]
    pub fn path_for_vault(vault_root: &Path) -> PathBuf {
        vault_root.join(CONFIG_FILE_NAME)
    }

    /// Pipeline switches derived from this config.
    #[must_use]
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            mentions: self.links.mentions,
            normalize_on_read: self.read.normalize,
            banner: BannerOptions {
                require_behavior: self.banner.require_behavior,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = VaultlinkConfig::from_toml_str("").unwrap();
        assert_eq!(config, VaultlinkConfig::default());
        let options = config.pipeline_options();
        assert!(options.mentions);
        assert!(!options.normalize_on_read);
        assert!(!options.banner.require_behavior);
    }

    #[test]
    fn sections_override_defaults() {
        let config = VaultlinkConfig::from_toml_str(
            "[links]\nmentions = false\n[read]\nnormalize = true\n[banner]\nrequire_behavior = true\n[vault]\nignore = [\"Templates\"]\n",
        )
        .unwrap();
        let options = config.pipeline_options();
        assert!(!options.mentions);
        assert!(options.normalize_on_read);
        assert!(options.banner.require_behavior);
        assert_eq!(config.vault.ignore, vec!["Templates".to_string()]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = VaultlinkConfig::from_toml_str("[links]\nmention = false\n").unwrap_err();
        assert!(matches!(err, VaultlinkError::Config(_)));
    }

    #[test]
    fn missing_vault_config_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = VaultlinkConfig::load_for_vault(dir.path()).unwrap();
        assert_eq!(config, VaultlinkConfig::default());

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[read]\nnormalize = true\n").unwrap();
        let config = VaultlinkConfig::load_for_vault(dir.path()).unwrap();
        assert!(config.read.normalize);
    }

    #[test]
    fn load_error_names_the_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[links]\nmention = false\n").unwrap();
        let message = VaultlinkConfig::load(&path).unwrap_err().to_string();
        assert_eq!(message.matches("config error").count(), 1);
        assert!(message.contains(&path.display().to_string()));
        assert!(message.contains("mention"));
    }
}
