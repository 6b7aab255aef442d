//! Google Vertex AI (Imagen) provider
//!
//! Authenticates with a service account key. The key file itself is kept in
//! the data directory; project and location go to the secret store.

mod api;
mod auth;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::output::{ImageWriter, RawImage};
use crate::paths::Paths;
use crate::provider::{
    Credentials, GENERATION_TIMEOUT, Generation, LOGIN_TIMEOUT, LoginField, Model, Provider,
    bounded,
};
use crate::secrets::SecretStore;
use crate::settings::{ModelSettings, Setting, SettingKind};

use api::{Instance, Parameters, PredictRequest, PredictionOutcome, VertexClient};
use auth::{ServiceAccountKey, fetch_access_token};

pub const PROVIDER_NAME: &str = "google";

pub const SERVICE_ACCOUNT_KEY: &str = "service_account_key";
pub const PROJECT_ID: &str = "project_id";
pub const LOCATION: &str = "location";

pub const NUMBER_OF_IMAGES: &str = "number_of_images";
pub const ASPECT_RATIO: &str = "aspect_ratio";
pub const OUTPUT_RESOLUTION: &str = "output_resolution";

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Settings shared by every Imagen model
fn imagen_settings() -> ModelSettings {
    ModelSettings::new(vec![
        Setting::new(
            NUMBER_OF_IMAGES,
            "Number of Images",
            SettingKind::int_range(1, 4),
            "1",
        ),
        Setting::new(
            ASPECT_RATIO,
            "Aspect Ratio",
            SettingKind::enumeration(["1:1", "16:9", "4:3", "9:16", "3:4"]),
            "1:1",
        ),
        Setting::new(
            OUTPUT_RESOLUTION,
            "Output Resolution",
            SettingKind::enumeration(["1K", "2K"]),
            "1K",
        ),
    ])
}

/// Project and location, as kept in the secret store
#[derive(Debug, Serialize, Deserialize)]
struct StoredCredentials {
    project_id: String,
    location: String,
}

/// Google Vertex AI Imagen provider
pub struct GoogleProvider {
    secrets: Arc<dyn SecretStore>,
    data_dir: PathBuf,
    writer: ImageWriter,
    endpoint: Option<String>,
    http: reqwest::Client,
    client: Mutex<Option<Arc<VertexClient>>>,
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider")
            .field("data_dir", &self.data_dir)
            .field("output_dir", &self.writer.dir())
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl GoogleProvider {
    pub fn new(secrets: Arc<dyn SecretStore>, paths: &Paths) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            secrets,
            data_dir: paths.data_dir.clone(),
            writer: ImageWriter::new(&paths.output_dir),
            endpoint: None,
            http,
            client: Mutex::new(None),
        })
    }

    /// Send predict requests to `endpoint` instead of the regional Vertex AI host
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn credential_dir(&self) -> PathBuf {
        self.data_dir.join(PROVIDER_NAME)
    }

    fn key_file(&self) -> PathBuf {
        self.credential_dir().join(SERVICE_ACCOUNT_KEY)
    }

    fn handle(&self) -> MutexGuard<'_, Option<Arc<VertexClient>>> {
        self.client.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current handle if its token is still usable
    fn fresh_client(&self) -> Option<Arc<VertexClient>> {
        self.handle().as_ref().filter(|c| c.is_fresh()).cloned()
    }

    async fn connect(&self, credentials: &Credentials) -> Result<VertexClient> {
        let key = ServiceAccountKey::from_json(&credentials.blob(SERVICE_ACCOUNT_KEY)?)?;
        let project_id = credentials.require(PROJECT_ID)?;
        let location = credentials.require(LOCATION)?;

        let token = fetch_access_token(&self.http, &key).await?;
        info!(project_id = %project_id, location = %location, "Authenticated with Vertex AI");

        Ok(VertexClient::new(
            self.http.clone(),
            token,
            project_id,
            location,
            self.endpoint.as_deref(),
        ))
    }

    /// Handle for a generation, logging in from stored credentials if needed
    async fn authenticated(&self, ctx: &CancellationToken) -> Result<Arc<VertexClient>> {
        if let Some(client) = self.fresh_client() {
            return Ok(client);
        }

        let credentials = self.load_credentials().await.map_err(|e| match e {
            e @ Error::NotLoggedIn(_) => e,
            other => Error::backend(PROVIDER_NAME, other),
        })?;
        self.connect_and_store(ctx, &credentials)
            .await
            .map_err(|e| Error::backend(PROVIDER_NAME, e))
    }

    /// Fetch a new token and keep the resulting handle
    async fn connect_and_store(
        &self,
        ctx: &CancellationToken,
        credentials: &Credentials,
    ) -> Result<Arc<VertexClient>> {
        let client = bounded(ctx, LOGIN_TIMEOUT, "login", self.connect(credentials)).await?;
        let client = Arc::new(client);
        *self.handle() = Some(client.clone());
        Ok(client)
    }

    fn build_request(prompt: &str, settings: &ModelSettings) -> PredictRequest {
        PredictRequest {
            instances: vec![Instance {
                prompt: prompt.to_string(),
            }],
            parameters: Parameters {
                sample_count: settings.get_int(NUMBER_OF_IMAGES, 1),
                aspect_ratio: settings.get_string(ASPECT_RATIO, "1:1"),
                sample_image_size: settings.get_string(OUTPUT_RESOLUTION, "1K"),
                include_rai_reason: true,
            },
        }
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn login_fields(&self) -> Vec<LoginField> {
        vec![
            LoginField::file(SERVICE_ACCOUNT_KEY, "Service Account Key File"),
            LoginField::text(PROJECT_ID, "Project ID"),
            LoginField::text(LOCATION, "Location"),
        ]
    }

    async fn save_credentials(&self, credentials: &Credentials) -> Result<()> {
        let key = credentials.blob(SERVICE_ACCOUNT_KEY)?;
        let stored = StoredCredentials {
            project_id: credentials.require(PROJECT_ID)?.to_string(),
            location: credentials.require(LOCATION)?.to_string(),
        };

        let dir = self.credential_dir();
        fs::create_dir_all(&dir)?;
        restrict_permissions(&dir, 0o700)?;
        let key_file = self.key_file();
        fs::write(&key_file, &key)?;
        restrict_permissions(&key_file, 0o600)?;

        self.secrets
            .set(PROVIDER_NAME, &serde_json::to_string(&stored)?)
            .await?;

        debug!(key_file = %key_file.display(), "Saved Google credentials");
        Ok(())
    }

    async fn load_credentials(&self) -> Result<Credentials> {
        let stored = self
            .secrets
            .get(PROVIDER_NAME)
            .await?
            .ok_or_else(|| Error::NotLoggedIn(PROVIDER_NAME.to_string()))?;
        let stored: StoredCredentials = serde_json::from_str(&stored).map_err(|e| {
            Error::InvalidCredential(format!("stored Google credentials are corrupt: {}", e))
        })?;

        let key = match fs::read(self.key_file()) {
            Ok(key) => key,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::InvalidCredential(
                    "service account key file is missing".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let mut credentials = Credentials::new();
        credentials.insert_blob(SERVICE_ACCOUNT_KEY, &key);
        credentials.insert(PROJECT_ID, stored.project_id);
        credentials.insert(LOCATION, stored.location);
        Ok(credentials)
    }

    async fn delete_credentials(&self) -> Result<()> {
        match fs::remove_dir_all(self.credential_dir()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.secrets.delete(PROVIDER_NAME).await
    }

    async fn login(&self, ctx: &CancellationToken, credentials: &Credentials) -> Result<()> {
        if self.fresh_client().is_some() {
            return Ok(());
        }

        self.connect_and_store(ctx, credentials).await?;
        Ok(())
    }

    async fn generate_image(
        &self,
        ctx: &CancellationToken,
        model: &str,
        prompt: &str,
        settings: &ModelSettings,
    ) -> Result<Generation> {
        let client = self.authenticated(ctx).await?;
        let request = Self::build_request(prompt, settings);

        let response = bounded(
            ctx,
            GENERATION_TIMEOUT,
            "generation",
            client.predict(model, &request),
        )
        .await
        .map_err(|e| Error::backend(PROVIDER_NAME, e))?;

        let mut images: Vec<RawImage> = Vec::new();
        let mut filtered = Vec::new();
        for prediction in response.predictions {
            match prediction
                .into_outcome()
                .map_err(|e| Error::backend(PROVIDER_NAME, e))?
            {
                PredictionOutcome::Image(image) => images.push(image),
                PredictionOutcome::Filtered(reason) => {
                    warn!(reason = %reason, "Image filtered by provider");
                    filtered.push(reason);
                }
            }
        }

        if images.is_empty() {
            return Err(Error::backend(
                PROVIDER_NAME,
                Error::NoImagesGenerated(filtered),
            ));
        }

        let paths = self
            .writer
            .write_all(&images)
            .map_err(|e| Error::backend(PROVIDER_NAME, e))?;

        info!(model = %model, images = paths.len(), filtered = filtered.len(), "Generation complete");
        Ok(Generation {
            images: paths,
            filtered,
        })
    }

    fn models(&self) -> Vec<Model> {
        vec![
            Model::new("imagen-4.0-generate-001", "Imagen 4", imagen_settings()),
            Model::new(
                "imagen-4.0-ultra-generate-001",
                "Imagen 4 Ultra",
                imagen_settings(),
            ),
            Model::new(
                "imagen-4.0-fast-generate-001",
                "Imagen 4 Fast",
                imagen_settings(),
            ),
        ]
    }

    async fn close(&self) -> Result<()> {
        self.handle().take();
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
