// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Config service and storage port for mapmerge tools.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Storage port for raw config blobs, keyed by section name (e.g. `"merge"`).
pub trait ConfigStore {
    /// Load a raw config blob. Returns `NotFound` when the section was never saved.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persist a raw config blob, replacing any previous one.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Section not present in the store.
    #[error("config section not found")]
    NotFound,
    /// I/O error while reading/writing.
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    /// Stored blob is not valid JSON for the requested type.
    #[error("config decode error: {0}")]
    Serde(#[from] serde_json::Error),
    /// A section decoded but holds values outside the accepted range.
    #[error("invalid config section {section:?}: {reason}")]
    Invalid {
        /// Section key.
        section: String,
        /// Human readable reason.
        reason: String,
    },
    /// Store-specific failure.
    #[error("config store error: {0}")]
    Other(String),
}

/// Serializes typed config sections as JSON and delegates storage to a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Wrap a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> ConfigService<S>
where
    S: ConfigStore,
{
    /// Load and decode a section. Missing or empty sections yield `Ok(None)`.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
    {
        match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Load a section, falling back to `T::default()` when it is missing.
    pub fn load_or_default<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        Ok(self.load(key)?.unwrap_or_default())
    }

    /// Encode and persist a section.
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), ConfigError>
    where
        T: Serialize,
    {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }
}
