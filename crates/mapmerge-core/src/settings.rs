// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Merge settings and their config section.

use mapmerge_app_core::config::{ConfigError, ConfigService, ConfigStore};
use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprinter;
use crate::MergeError;

/// Default significant digits kept when hashing floats.
pub const DEFAULT_SIGNIFICANT_DIGITS: u32 = 6;

/// Tunables shared by comparison and apply.
///
/// The same settings must be used to build and to apply an operation, so the
/// comparison result carries a copy and hands it to the operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    /// Significant decimal digits kept per float in fingerprints (`1..=15`).
    pub significant_digits: u32,
    /// Attribute used to match entities across scenes.
    pub identity_key: String,
    /// Classname of the world entity, which is matched even without a name.
    pub world_classname: String,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            significant_digits: DEFAULT_SIGNIFICANT_DIGITS,
            identity_key: "name".to_owned(),
            world_classname: "worldspawn".to_owned(),
        }
    }
}

impl MergeSettings {
    /// Config section holding these settings.
    pub const CONFIG_SECTION: &'static str = "merge";

    /// Reject settings the engine cannot work with.
    pub fn validate(&self) -> Result<(), MergeError> {
        if !(1..=15).contains(&self.significant_digits) {
            return Err(MergeError::InvalidSettings(format!(
                "significant_digits must be within 1..=15, got {}",
                self.significant_digits
            )));
        }
        if self.identity_key.is_empty() {
            return Err(MergeError::InvalidSettings(
                "identity_key must not be empty".to_owned(),
            ));
        }
        Ok(())
    }

    /// Fingerprinter configured with these settings.
    pub fn fingerprinter(&self) -> Fingerprinter {
        Fingerprinter::new(self.significant_digits)
    }

    /// Load the `merge` section, falling back to defaults when it is absent.
    pub fn load<S: ConfigStore>(service: &ConfigService<S>) -> Result<Self, ConfigError> {
        let settings: Self = service.load_or_default(Self::CONFIG_SECTION)?;
        settings
            .validate()
            .map_err(|err| ConfigError::Invalid {
                section: Self::CONFIG_SECTION.to_owned(),
                reason: err.to_string(),
            })?;
        Ok(settings)
    }

    /// Persist these settings as the `merge` section.
    pub fn save<S: ConfigStore>(&self, service: &ConfigService<S>) -> Result<(), ConfigError> {
        service.save(Self::CONFIG_SECTION, self)
    }
}
