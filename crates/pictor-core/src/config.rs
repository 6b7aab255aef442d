//! Configuration management with file persistence

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::provider::{Model, ModelId, ProviderRegistry};

/// Pictor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model selected at session start, as `<provider>/<model>`
    pub default_model: String,
    /// Setting values applied on top of every model's defaults
    pub default_model_settings: BTreeMap<String, String>,
    /// Providers the user has logged in to, in login order
    pub providers: Vec<ProviderEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub name: String,
}

/// A model offered by one of the configured providers
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: ModelId,
    pub model: Model,
}

impl Config {
    /// Load configuration from `path`, or the default if it doesn't exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to `path`, replacing the old file atomically
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create config directory: {}", dir.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write config file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace config file: {}", path.display()))?;

        Ok(())
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.iter().any(|p| p.name == name)
    }

    /// Record a login; returns false if the provider was already present
    pub fn add_provider(&mut self, name: &str) -> bool {
        if self.has_provider(name) {
            return false;
        }
        self.providers.push(ProviderEntry {
            name: name.to_string(),
        });
        true
    }

    /// Forget a provider; returns false if it was not present
    pub fn remove_provider(&mut self, name: &str) -> bool {
        let before = self.providers.len();
        self.providers.retain(|p| p.name != name);
        self.providers.len() != before
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name.clone()).collect()
    }

    /// Models of all configured providers, in config order, with the user's
    /// default settings applied
    pub fn catalog(&self, registry: &ProviderRegistry) -> Vec<CatalogEntry> {
        let mut entries = Vec::new();
        for entry in &self.providers {
            let provider = match registry.get(&entry.name) {
                Ok(provider) => provider,
                Err(e) => {
                    warn!(provider = %entry.name, error = %e, "Skipping configured provider");
                    continue;
                }
            };
            for mut model in provider.models() {
                model.settings.apply_defaults(&self.default_model_settings);
                entries.push(CatalogEntry {
                    id: ModelId::new(provider.name(), &model.name),
                    model,
                });
            }
        }
        entries
    }
}
