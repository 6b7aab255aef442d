//! Concrete image generation providers

pub mod google;

use std::sync::Arc;

use crate::error::Result;
use crate::paths::Paths;
use crate::provider::ProviderRegistry;
use crate::secrets::SecretStore;

pub use google::GoogleProvider;

/// Build the registry of every provider pictor ships with.
///
/// Registration order here is the order providers are offered to the user.
pub fn default_registry(secrets: Arc<dyn SecretStore>, paths: &Paths) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(GoogleProvider::new(secrets, paths)?));
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::InMemorySecretStore;

    #[test]
    fn test_default_registry_contains_google() {
        let paths = Paths::under("/tmp/pictor-test/config", "/tmp/pictor-test/out");
        let registry = default_registry(Arc::new(InMemorySecretStore::new()), &paths).unwrap();
        assert_eq!(registry.names(), ["google"]);
        assert!(!registry.get("google").unwrap().models().is_empty());
    }
}
