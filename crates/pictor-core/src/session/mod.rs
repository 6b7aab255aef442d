//! Interactive session controller
//!
//! Reads prompt lines through an [`Interaction`], classifies them with the
//! dispatch table in [`command`] and drives model selection, settings edits
//! and generation. Errors from a backend are reported and the loop goes on;
//! configuration errors end the session; an abort by the user ends it cleanly.

pub mod command;
mod interaction;

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{CatalogEntry, Config};
use crate::error::{Error, ErrorCategory, Result};
use crate::provider::{ModelId, ProviderRegistry};
use crate::settings::ModelSettings;

pub use command::{Command, Input, SessionState};
pub use interaction::Interaction;

/// One interactive session over the configured providers' models
pub struct Session<'r> {
    registry: &'r ProviderRegistry,
    catalog: Vec<CatalogEntry>,
    active: usize,
    /// Working settings per model, edits survive switching models
    working: HashMap<ModelId, ModelSettings>,
    last_prompt: Option<String>,
    ctx: CancellationToken,
}

impl<'r> Session<'r> {
    /// Resolve the initial model: the configured default if it still exists,
    /// else the first model of the first configured provider
    pub fn start(
        registry: &'r ProviderRegistry,
        config: &Config,
        ctx: CancellationToken,
    ) -> Result<Self> {
        let catalog = config.catalog(registry);
        if catalog.is_empty() {
            return Err(Error::NoModelAvailable);
        }

        let default = config.default_model.parse::<ModelId>().ok();
        let active = match default
            .as_ref()
            .and_then(|id| catalog.iter().position(|entry| &entry.id == id))
        {
            Some(index) => index,
            None => {
                if !config.default_model.is_empty() {
                    warn!(
                        default_model = %config.default_model,
                        "Configured default model is unavailable, using {}",
                        catalog[0].id
                    );
                }
                0
            }
        };

        info!(model = %catalog[active].id, models = catalog.len(), "Session started");
        Ok(Self {
            registry,
            catalog,
            active,
            working: HashMap::new(),
            last_prompt: None,
            ctx,
        })
    }

    pub fn active_model(&self) -> &ModelId {
        &self.catalog[self.active].id
    }

    /// Settings the next generation will use
    pub fn settings(&self) -> &ModelSettings {
        let entry = &self.catalog[self.active];
        self.working.get(&entry.id).unwrap_or(&entry.model.settings)
    }

    /// Last prompt that produced images
    pub fn last_prompt(&self) -> Option<&str> {
        self.last_prompt.as_deref()
    }

    fn settings_mut(&mut self) -> &mut ModelSettings {
        let entry = &self.catalog[self.active];
        self.working
            .entry(entry.id.clone())
            .or_insert_with(|| entry.model.settings.clone())
    }

    /// Run until the user exits, aborts or the context is cancelled
    pub async fn run(&mut self, ui: &mut dyn Interaction) -> Result<()> {
        loop {
            if self.ctx.is_cancelled() {
                debug!("Session cancelled");
                return Ok(());
            }
            match self.step(ui).await {
                Ok(SessionState::Exiting) => return Ok(()),
                Ok(_) => {}
                Err(e) if e.is_interrupt() => {
                    debug!(reason = %e, "Session interrupted");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Read and handle one prompt line, returning the state it led to
    pub async fn step(&mut self, ui: &mut dyn Interaction) -> Result<SessionState> {
        let label = self.active_model().to_string();
        let input = Input::parse(&ui.prompt(&label)?);
        let state = input.transition();

        match input {
            Input::Blank => {}
            Input::Invalid(command) => ui.notify(&format!("invalid command: {:?}", command)),
            Input::Command(Command::Exit) => {}
            Input::Command(Command::Models) => {
                if !self.choose_model(ui)? {
                    return Ok(SessionState::AwaitingPrompt);
                }
            }
            Input::Command(Command::Settings) => self.edit_settings(ui)?,
            Input::Command(Command::Retry) => match self.last_prompt.clone() {
                Some(prompt) => self.generate(ui, &prompt).await?,
                None => {
                    ui.notify("Nothing to retry yet");
                    return Ok(SessionState::AwaitingPrompt);
                }
            },
            Input::Prompt(prompt) => self.generate(ui, &prompt).await?,
        }

        Ok(state)
    }

    /// Switch the active model; `false` if the selection was out of range
    fn choose_model(&mut self, ui: &mut dyn Interaction) -> Result<bool> {
        let options: Vec<String> = self
            .catalog
            .iter()
            .map(|entry| format!("{} ({})", entry.model.display_name, entry.id))
            .collect();

        let choice = ui.select("Model", &options, self.active)?;
        if choice >= self.catalog.len() {
            warn!(choice, models = self.catalog.len(), "Model selection out of range");
            ui.notify(&format!("No model at position {}", choice + 1));
            return Ok(false);
        }

        self.active = choice;
        info!(model = %self.active_model(), "Switched model");
        Ok(true)
    }

    fn edit_settings(&mut self, ui: &mut dyn Interaction) -> Result<()> {
        let settings = self.settings_mut();
        let fields = settings.form();
        if fields.is_empty() {
            ui.notify("This model has no settings");
            return Ok(());
        }

        for (name, value) in ui.edit_settings(&fields)? {
            if let Err(e) = settings.set(&name, &value) {
                ui.notify(&e.to_string());
            }
        }
        Ok(())
    }

    /// Generate for `prompt`. Only configuration and interrupt errors
    /// propagate; everything else is reported to the user.
    async fn generate(&mut self, ui: &mut dyn Interaction, prompt: &str) -> Result<()> {
        let id = self.active_model().clone();
        let provider = self.registry.get(&id.provider)?;
        let settings = self.settings_mut().clone();

        debug!(model = %id, prompt = %prompt, "Generating");
        match provider
            .generate_image(&self.ctx, &id.model, prompt, &settings)
            .await
        {
            Ok(generation) => {
                self.last_prompt = Some(prompt.to_string());
                info!(model = %id, images = generation.images.len(), "Generated images");
                if !generation.filtered.is_empty() {
                    ui.notify(&format!(
                        "{} image(s) filtered: {}",
                        generation.filtered.len(),
                        generation.filtered.join("; ")
                    ));
                }
                ui.show_images(&generation);
                Ok(())
            }
            Err(e) => match e.category() {
                ErrorCategory::Configuration | ErrorCategory::Interrupt => Err(e),
                _ => {
                    warn!(model = %id, error = %e, "Generation failed");
                    ui.notify(&report(&e));
                    Ok(())
                }
            },
        }
    }
}

/// Render an error for the user, with a hint when one exists
fn report(error: &Error) -> String {
    match error.suggestion() {
        Some(hint) => format!("{} (try: {})", error, hint),
        None => error.to_string(),
    }
}
