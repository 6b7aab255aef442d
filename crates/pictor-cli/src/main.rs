//! Pictor CLI - generate images from text prompts

mod display;
mod terminal;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use pictor_core::auth;
use pictor_core::config::Config;
use pictor_core::paths::Paths;
use pictor_core::provider::ProviderRegistry;
use pictor_core::providers::default_registry;
use pictor_core::secrets::KeyringSecretStore;
use pictor_core::session::Session;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::terminal::Terminal;

#[derive(Parser)]
#[command(name = "pictor")]
#[command(author, version, about = "Generate images from text prompts using AI")]
#[command(
    long_about = "Generate images from text prompts using AI image providers. Run without \
    arguments to start an interactive session: type a prompt to generate, /models to switch \
    model, /settings to adjust the model's settings, /retry to repeat the last prompt and \
    /exit to quit."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbose logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage authentication with image generation providers
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
}

#[derive(Subcommand)]
enum AuthAction {
    /// Log in to a provider
    Login,
    /// Log out from a provider and delete its stored credentials
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose { "pictor=debug" } else { "pictor=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let paths = Paths::resolve()?;
    debug!(config_dir = %paths.config_dir.display(), output_dir = %paths.output_dir.display(), "Resolved paths");

    let registry = default_registry(Arc::new(KeyringSecretStore::new()), &paths)?;

    let ctx = CancellationToken::new();
    tokio::spawn({
        let ctx = ctx.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctx.cancel();
            }
        }
    });

    let result = match cli.command {
        None => cmd_session(&registry, &paths, ctx).await,
        Some(Commands::Auth { action }) => cmd_auth(&registry, &paths, action, &ctx).await,
    };

    if let Err(e) = registry.close_all().await {
        warn!(error = %e, "Failed to close providers");
    }

    result
}

/// Surface an error with its hint; interrupts are not errors
fn finish<T>(result: pictor_core::Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_interrupt() => Ok(None),
        Err(e) => {
            if let Some(hint) = e.suggestion() {
                eprintln!("Hint: {}", hint);
            }
            Err(e.into())
        }
    }
}

async fn cmd_session(
    registry: &ProviderRegistry,
    paths: &Paths,
    ctx: CancellationToken,
) -> anyhow::Result<()> {
    let config = Config::load_from(&paths.config_file())?;
    let Some(mut session) = finish(Session::start(registry, &config, ctx))? else {
        return Ok(());
    };

    let mut terminal = Terminal::new()?;
    println!("Type a prompt, or /models, /settings, /retry, /exit.");
    finish(session.run(&mut terminal).await)?;
    Ok(())
}

async fn cmd_auth(
    registry: &ProviderRegistry,
    paths: &Paths,
    action: AuthAction,
    ctx: &CancellationToken,
) -> anyhow::Result<()> {
    let config_path = paths.config_file();
    let mut config = Config::load_from(&config_path)?;
    let mut terminal = Terminal::new()?;

    match action {
        AuthAction::Login => {
            let outcome =
                auth::login(registry, &mut config, &config_path, &mut terminal, ctx).await;
            if let Some(name) = finish(outcome)? {
                println!("Logged in to {}.", name);
            }
        }
        AuthAction::Logout => {
            let outcome = auth::logout(registry, &mut config, &config_path, &mut terminal).await;
            if let Some(name) = finish(outcome)? {
                println!("Logged out from {}.", name);
            }
        }
    }

    Ok(())
}
