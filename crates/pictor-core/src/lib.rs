//! Pictor Core Library
//!
//! This crate provides the core functionality for pictor, including:
//! - Self-describing model settings (schema, collection, form rendering)
//! - The provider contract and registry
//! - Concrete providers (Google Vertex AI Imagen)
//! - Secret storage (OS keyring)
//! - Configuration and path resolution
//! - Authentication flows and the interactive session controller

pub mod auth;
pub mod config;
pub mod error;
pub mod output;
pub mod paths;
pub mod provider;
pub mod providers;
pub mod secrets;
pub mod session;
pub mod settings;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::provider::{Credentials, Generation, Model, ModelId, Provider, ProviderRegistry};
    pub use crate::session::{Interaction, Session};
    pub use crate::settings::{ModelSettings, Setting, SettingKind};
}
