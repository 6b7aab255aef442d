//! Secret storage for provider credentials
//!
//! Stores one opaque string per provider in the operating system's
//! credential store (macOS Keychain, Windows Credential Manager, Linux
//! Secret Service), under a fixed service namespace.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use keyring::Entry;

use crate::error::{Error, Result};

/// Service name used for keyring storage
pub const KEYRING_SERVICE: &str = "pictor";

/// Key/value store for secrets, keyed by provider name
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// `None` when nothing is stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remove `key`; already absent is success
    async fn delete(&self, key: &str) -> Result<()>;
}

/// OS keyring-based secret store
#[derive(Debug, Clone)]
pub struct KeyringSecretStore {
    service: String,
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringSecretStore {
    pub fn new() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }

    /// Use a custom service namespace (useful for testing)
    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key)
            .map_err(|e| Error::SecretStore(format!("Failed to create keyring entry: {}", e)))
    }
}

#[async_trait]
impl SecretStore for KeyringSecretStore {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let entry = self.entry(key)?;
        let value = value.to_string();

        // keyring operations are blocking
        tokio::task::spawn_blocking(move || {
            entry
                .set_password(&value)
                .map_err(|e| Error::SecretStore(format!("Failed to store secret: {}", e)))
        })
        .await
        .map_err(|e| Error::SecretStore(format!("Task join error: {}", e)))?
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entry = self.entry(key)?;

        let result = tokio::task::spawn_blocking(move || entry.get_password())
            .await
            .map_err(|e| Error::SecretStore(format!("Task join error: {}", e)))?;

        match result {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::SecretStore(format!(
                "Failed to retrieve secret: {}",
                e
            ))),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let entry = self.entry(key)?;

        tokio::task::spawn_blocking(move || match entry.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::SecretStore(format!("Failed to delete secret: {}", e))),
        })
        .await
        .map_err(|e| Error::SecretStore(format!("Task join error: {}", e)))?
    }
}

/// In-memory secret store for testing
///
/// Secrets live only as long as the value. Do not use in production.
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: Mutex<HashMap<String, String>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.secrets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}
