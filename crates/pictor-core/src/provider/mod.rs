//! Provider contract
//!
//! Every image generation backend implements [`Provider`]. The session only
//! talks to backends through this trait and the [`ProviderRegistry`].

mod credentials;
mod registry;

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::settings::ModelSettings;

pub use credentials::{Credentials, LoginField, LoginFieldKind};
pub use registry::ProviderRegistry;

/// Upper bound for establishing a backend connection
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound for a single generation request
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Catalog entry of a provider
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// Provider-internal identifier
    pub name: String,
    pub display_name: String,
    /// Settings template; sessions work on a copy
    pub settings: ModelSettings,
}

impl Model {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        settings: ModelSettings,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            settings,
        }
    }
}

/// Composite model identifier `<provider>/<model>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelId {
    pub provider: String,
    pub model: String,
}

impl ModelId {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

impl FromStr for ModelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
                Ok(Self::new(provider, model))
            }
            _ => Err(Error::InvalidModelId(s.to_string())),
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// Result of one generation request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    /// Written files, in generation order
    pub images: Vec<PathBuf>,
    /// Reasons given upstream for images that were filtered out
    pub filtered: Vec<String>,
}

/// An image generation backend
///
/// One instance per provider name lives in the registry for the whole
/// process. Implementations keep their authenticated handle internally;
/// `login` and `close` must be idempotent.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier, first segment of a [`ModelId`]
    fn name(&self) -> &str;

    /// Fields `login` and `save_credentials` expect. Empty when the provider
    /// needs no interactive credential step.
    fn login_fields(&self) -> Vec<LoginField>;

    /// Persist credentials. Fails if a required field is absent.
    async fn save_credentials(&self, credentials: &Credentials) -> Result<()>;

    /// Load persisted credentials; [`Error::NotLoggedIn`] if there are none
    async fn load_credentials(&self) -> Result<Credentials>;

    /// Remove persisted credentials. Already absent is success.
    async fn delete_credentials(&self) -> Result<()>;

    /// Establish the backend handle; a no-op when already authenticated
    async fn login(&self, ctx: &CancellationToken, credentials: &Credentials) -> Result<()>;

    /// Generate images for `prompt` with `model`, writing them to disk
    async fn generate_image(
        &self,
        ctx: &CancellationToken,
        model: &str,
        prompt: &str,
        settings: &ModelSettings,
    ) -> Result<Generation>;

    /// Static model catalog
    fn models(&self) -> Vec<Model>;

    /// Release the backend handle; callable without a prior login
    async fn close(&self) -> Result<()>;
}

/// Run `operation` bounded by `timeout` and cancellable through `ctx`
pub async fn bounded<T, F>(
    ctx: &CancellationToken,
    timeout: Duration,
    operation: &'static str,
    future: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        _ = ctx.cancelled() => Err(Error::Cancelled),
        result = tokio::time::timeout(timeout, future) => match result {
            Ok(inner) => inner,
            Err(_) => Err(Error::Timeout {
                operation,
                secs: timeout.as_secs(),
            }),
        },
    }
}
