//! Registry of provider instances

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::Provider;

/// Provider instances keyed by name, in registration order.
///
/// Built once at startup and read-only afterwards.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider. On a duplicate name the earlier registration keeps
    /// answering lookups.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        if self.providers.iter().any(|p| p.name() == provider.name()) {
            warn!(provider = %provider.name(), "Provider registered twice, keeping the first");
        }
        debug!(provider = %provider.name(), "Registered provider");
        self.providers.push(provider);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, provider: Arc<dyn Provider>) -> Self {
        self.register(provider);
        self
    }

    /// Distinct provider names in registration order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            if !names.iter().any(|n| n == provider.name()) {
                names.push(provider.name().to_string());
            }
        }
        names
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .cloned()
            .ok_or_else(|| Error::ProviderNotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Close every provider, attempting all of them even if some fail
    pub async fn close_all(&self) -> Result<()> {
        let mut errors = Vec::new();
        for provider in &self.providers {
            if let Err(e) = provider.close().await {
                warn!(provider = %provider.name(), error = %e, "Failed to close provider");
                errors.push(Error::Other(format!(
                    "failed to close provider '{}': {}",
                    provider.name(),
                    e
                )));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Aggregate(errors))
        }
    }
}
