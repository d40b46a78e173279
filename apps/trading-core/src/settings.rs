//! Runtime configuration loaded from a file.
//!
//! One file carries the venue product universe and the advisor group
//! entries. TOML, YAML, and JSON all work; the format is inferred from
//! the file extension.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::groups::RawGroupsConfig;
use crate::models::Product;

/// Per-venue settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VenueSettings {
    /// Product symbols traded on the venue.
    #[serde(default)]
    pub products: Vec<String>,
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSettings {
    /// Venues keyed by venue id.
    #[serde(default)]
    pub venues: BTreeMap<String, VenueSettings>,
    /// Advisor group entries keyed by group id.
    #[serde(default)]
    pub groups: RawGroupsConfig,
}

/// Errors loading or deserializing the configuration file.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct SettingsError(#[from] config::ConfigError);

impl RuntimeSettings {
    /// Load settings from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the file is missing or does not
    /// deserialize.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Parse settings from a TOML string. Test and embedding hook.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the string does not deserialize.
    pub fn from_toml(raw: &str) -> Result<Self, SettingsError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// The product universe: every product of every venue.
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.venues
            .iter()
            .flat_map(|(venue_id, venue)| {
                venue
                    .products
                    .iter()
                    .map(|symbol| Product::new(venue_id.clone(), symbol.clone()))
            })
            .collect()
    }
}
