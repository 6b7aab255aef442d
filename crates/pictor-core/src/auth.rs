//! Provider login and logout flows

use std::fs;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::provider::{Credentials, LoginField, ProviderRegistry};
use crate::session::Interaction;

/// Registered providers the user is not logged in to, in registration order
pub fn login_candidates(registry: &ProviderRegistry, config: &Config) -> Vec<String> {
    registry
        .names()
        .into_iter()
        .filter(|name| !config.has_provider(name))
        .collect()
}

/// Ask for every login field. File fields are read from the path the user
/// gives and carried as blobs.
pub fn collect_credentials(
    fields: &[LoginField],
    ui: &mut dyn Interaction,
) -> Result<Credentials> {
    let mut credentials = Credentials::new();
    for field in fields {
        let answer = ui.login_field(field)?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(Error::MissingCredential(field.name.clone()));
        }

        if field.is_blob() {
            let path = expand_home(answer);
            let contents = fs::read(&path).map_err(|e| {
                Error::InvalidInput(format!("cannot read {}: {}", path.display(), e))
            })?;
            credentials.insert_blob(&field.name, &contents);
        } else {
            credentials.insert(&field.name, answer);
        }
    }
    Ok(credentials)
}

/// Pick a provider, collect and verify its credentials, then persist them
/// and record the provider in the config. Returns the provider name.
pub async fn login(
    registry: &ProviderRegistry,
    config: &mut Config,
    config_path: &Path,
    ui: &mut dyn Interaction,
    ctx: &CancellationToken,
) -> Result<String> {
    let candidates = login_candidates(registry, config);
    if candidates.is_empty() {
        return Err(Error::NoProvidersAvailable);
    }

    let name = pick(ui, "Provider", &candidates)?;
    let provider = registry.get(&name)?;
    let credentials = collect_credentials(&provider.login_fields(), ui)?;

    provider
        .login(ctx, &credentials)
        .await
        .map_err(|e| Error::backend(&name, e))?;
    provider.save_credentials(&credentials).await?;

    config.add_provider(&name);
    save(config, config_path)?;

    info!(provider = %name, "Logged in");
    Ok(name)
}

/// Pick a configured provider, drop its credentials and forget it.
/// Returns the provider name.
pub async fn logout(
    registry: &ProviderRegistry,
    config: &mut Config,
    config_path: &Path,
    ui: &mut dyn Interaction,
) -> Result<String> {
    let configured = config.provider_names();
    if configured.is_empty() {
        return Err(Error::NotLoggedInAnywhere);
    }

    let name = pick(ui, "Provider", &configured)?;
    registry.get(&name)?.delete_credentials().await?;

    config.remove_provider(&name);
    save(config, config_path)?;

    info!(provider = %name, "Logged out");
    Ok(name)
}

fn pick(ui: &mut dyn Interaction, title: &str, options: &[String]) -> Result<String> {
    let choice = ui.select(title, options, 0)?;
    options
        .get(choice)
        .cloned()
        .ok_or_else(|| Error::InvalidInput(format!("no option at index {}", choice)))
}

fn save(config: &Config, path: &Path) -> Result<()> {
    config
        .save_to(path)
        .map_err(|e| Error::ConfigError(format!("{:#}", e)))
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Provider;
    use crate::testing::{FakeProvider, ScriptedUi, Step};
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn key_file(dir: &TempDir) -> String {
        let path = dir.path().join("key.json");
        fs::write(&path, b"{\"secret\":1}").unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_login_candidates_skip_configured() {
        let registry = ProviderRegistry::new()
            .with(Arc::new(FakeProvider::new("acme", &["a"])))
            .with(Arc::new(FakeProvider::new("zeta", &["z"])));
        let mut config = Config::default();
        config.add_provider("acme");

        assert_eq!(login_candidates(&registry, &config), ["zeta"]);
    }

    #[test]
    fn test_login_candidates_list_each_provider_once() {
        let registry = ProviderRegistry::new()
            .with(Arc::new(FakeProvider::new("acme", &["a"])))
            .with(Arc::new(FakeProvider::new("acme", &["b"])));

        assert_eq!(login_candidates(&registry, &Config::default()), ["acme"]);
    }

    #[test]
    fn test_collect_credentials_reads_files_as_blobs() {
        let dir = TempDir::new().unwrap();
        let fields = FakeProvider::new("acme", &[]).login_fields();
        let mut ui = ScriptedUi::new([Step::Field(key_file(&dir)), Step::Field(" s3cret ".into())]);

        let credentials = collect_credentials(&fields, &mut ui).unwrap();
        assert_eq!(credentials.blob("key_file").unwrap(), b"{\"secret\":1}");
        assert_eq!(credentials.get("token"), Some("s3cret"));
    }

    #[test]
    fn test_collect_credentials_rejects_blank_and_missing_files() {
        let fields = FakeProvider::new("acme", &[]).login_fields();

        let mut ui = ScriptedUi::new([Step::Field("  ".into())]);
        assert!(matches!(
            collect_credentials(&fields, &mut ui),
            Err(Error::MissingCredential(name)) if name == "key_file"
        ));

        let mut ui = ScriptedUi::new([Step::Field("/definitely/not/here.json".into())]);
        assert!(matches!(
            collect_credentials(&fields, &mut ui),
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_login_saves_credentials_and_config() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        let provider = Arc::new(FakeProvider::new("acme", &["a"]));
        let registry = ProviderRegistry::new().with(provider.clone());
        let mut config = Config::default();

        let mut ui = ScriptedUi::new([
            Step::Select(0),
            Step::Field(key_file(&dir)),
            Step::Field("tok".into()),
        ]);
        let name = login(&registry, &mut config, &config_path, &mut ui, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(name, "acme");
        assert_eq!(provider.logins.load(Ordering::SeqCst), 1);
        assert_eq!(provider.stored().unwrap().get("token"), Some("tok"));
        assert_eq!(Config::load_from(&config_path).unwrap().provider_names(), ["acme"]);
    }

    #[tokio::test]
    async fn test_failed_login_persists_nothing() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        let provider = Arc::new(FakeProvider::new("acme", &["a"]).failing_login());
        let registry = ProviderRegistry::new().with(provider.clone());
        let mut config = Config::default();

        let mut ui = ScriptedUi::new([
            Step::Select(0),
            Step::Field(key_file(&dir)),
            Step::Field("tok".into()),
        ]);
        let err = login(&registry, &mut config, &config_path, &mut ui, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "acme: Invalid credentials: rejected");
        assert!(provider.stored().is_none());
        assert!(!config.has_provider("acme"));
        assert!(!config_path.exists());
    }

    #[tokio::test]
    async fn test_login_without_candidates() {
        let dir = TempDir::new().unwrap();
        let registry = ProviderRegistry::new().with(Arc::new(FakeProvider::new("acme", &["a"])));
        let mut config = Config::default();
        config.add_provider("acme");

        let mut ui = ScriptedUi::default();
        let err = login(
            &registry,
            &mut config,
            &dir.path().join("config.toml"),
            &mut ui,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NoProvidersAvailable));
    }

    #[tokio::test]
    async fn test_logout_removes_provider() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        let provider = Arc::new(FakeProvider::new("acme", &["a"]));
        provider
            .save_credentials(&Credentials::from_iter([("token", "tok")]))
            .await
            .unwrap();
        let registry = ProviderRegistry::new().with(provider.clone());
        let mut config = Config::default();
        config.add_provider("acme");

        let mut ui = ScriptedUi::new([Step::Select(0)]);
        let name = logout(&registry, &mut config, &config_path, &mut ui)
            .await
            .unwrap();

        assert_eq!(name, "acme");
        assert!(provider.stored().is_none());
        assert!(Config::load_from(&config_path).unwrap().providers.is_empty());
    }

    #[tokio::test]
    async fn test_logout_when_not_logged_in() {
        let dir = TempDir::new().unwrap();
        let registry = ProviderRegistry::new();
        let mut config = Config::default();
        let mut ui = ScriptedUi::default();

        let err = logout(&registry, &mut config, &dir.path().join("config.toml"), &mut ui)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotLoggedInAnywhere));
    }
}
