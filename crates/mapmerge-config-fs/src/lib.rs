// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Filesystem-backed `ConfigStore` for mapmerge tools.
//!
//! Each config section is one JSON file (`<section>.json`) under a base
//! directory: the platform config dir by default (e.g. `~/.config/mapmerge`),
//! or any directory the host picks.

use directories::ProjectDirs;
use mapmerge_app_core::config::{ConfigError, ConfigStore};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Store config sections as JSON files under a base directory.
#[derive(Debug, Clone)]
pub struct FsConfigStore {
    base: PathBuf,
}

impl FsConfigStore {
    /// Create a store rooted at the user config directory.
    pub fn new() -> Result<Self, ConfigError> {
        let proj = ProjectDirs::from("dev", "flyingrobots", "mapmerge")
            .ok_or_else(|| ConfigError::Other("could not resolve config dir".into()))?;
        Self::at(proj.config_dir())
    }

    /// Create a store rooted at `base`, creating the directory if needed.
    pub fn at(base: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let base = base.as_ref().to_path_buf();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    /// Directory holding the section files.
    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ConfigError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ConfigError::Other(format!("invalid section name {key:?}")));
        }
        Ok(self.base.join(format!("{key}.json")))
    }
}

impl ConfigStore for FsConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        match fs::read(self.path_for(key)?) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(ConfigError::NotFound),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.base)?;
        fs::write(path, data)?;
        Ok(())
    }
}
