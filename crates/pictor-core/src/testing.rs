//! Fakes shared by unit tests

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::provider::{Credentials, Generation, LoginField, Model, Provider};
use crate::session::Interaction;
use crate::settings::{FormField, ModelSettings, Setting, SettingKind};

/// A generation request as the fake provider saw it
#[derive(Debug, Clone)]
pub struct Request {
    pub model: String,
    pub prompt: String,
    pub settings: ModelSettings,
}

pub fn sample_settings() -> ModelSettings {
    ModelSettings::new(vec![
        Setting::new("count", "Count", SettingKind::int_range(1, 4), "1"),
        Setting::new(
            "style",
            "Style",
            SettingKind::enumeration(["photo", "sketch"]),
            "photo",
        ),
    ])
}

pub struct FakeProvider {
    name: String,
    models: Vec<Model>,
    outcomes: Mutex<VecDeque<Result<Generation>>>,
    requests: Mutex<Vec<Request>>,
    stored: Mutex<Option<Credentials>>,
    fail_login: bool,
    pub logins: AtomicUsize,
}

impl FakeProvider {
    pub fn new(name: &str, models: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            models: models
                .iter()
                .map(|m| Model::new(*m, m.to_uppercase(), sample_settings()))
                .collect(),
            outcomes: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            stored: Mutex::new(None),
            fail_login: false,
            logins: AtomicUsize::new(0),
        }
    }

    pub fn failing_login(mut self) -> Self {
        self.fail_login = true;
        self
    }

    /// Queue the result of the next generation; unqueued calls succeed
    pub fn then(self, outcome: Result<Generation>) -> Self {
        self.outcomes.lock().unwrap().push_back(outcome);
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn stored(&self) -> Option<Credentials> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn login_fields(&self) -> Vec<LoginField> {
        vec![
            LoginField::file("key_file", "Key File"),
            LoginField::secret("token", "Token"),
        ]
    }

    async fn save_credentials(&self, credentials: &Credentials) -> Result<()> {
        credentials.require("token")?;
        *self.stored.lock().unwrap() = Some(credentials.clone());
        Ok(())
    }

    async fn load_credentials(&self) -> Result<Credentials> {
        self.stored()
            .ok_or_else(|| Error::NotLoggedIn(self.name.clone()))
    }

    async fn delete_credentials(&self) -> Result<()> {
        self.stored.lock().unwrap().take();
        Ok(())
    }

    async fn login(&self, _ctx: &CancellationToken, _credentials: &Credentials) -> Result<()> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        if self.fail_login {
            return Err(Error::InvalidCredential("rejected".to_string()));
        }
        Ok(())
    }

    async fn generate_image(
        &self,
        _ctx: &CancellationToken,
        model: &str,
        prompt: &str,
        settings: &ModelSettings,
    ) -> Result<Generation> {
        self.requests.lock().unwrap().push(Request {
            model: model.to_string(),
            prompt: prompt.to_string(),
            settings: settings.clone(),
        });
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(Generation {
                    images: vec![PathBuf::from(format!("/out/{}.png", prompt))],
                    filtered: Vec::new(),
                })
            })
    }

    fn models(&self) -> Vec<Model> {
        self.models.clone()
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// One scripted answer
#[derive(Debug, Clone)]
pub enum Step {
    Line(&'static str),
    Select(usize),
    Settings(Vec<(&'static str, &'static str)>),
    Field(String),
    Abort,
}

/// Interaction replaying a fixed script; running out of script aborts
#[derive(Default)]
pub struct ScriptedUi {
    script: VecDeque<Step>,
    pub prompts: usize,
    pub select_options: Vec<Vec<String>>,
    pub forms: Vec<Vec<FormField>>,
    pub shown: Vec<Generation>,
    pub notices: Vec<String>,
}

impl ScriptedUi {
    pub fn new(script: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    fn next(&mut self) -> Result<Step> {
        match self.script.pop_front() {
            Some(Step::Abort) | None => Err(Error::UserCancelled),
            Some(step) => Ok(step),
        }
    }
}

impl Interaction for ScriptedUi {
    fn prompt(&mut self, _model: &str) -> Result<String> {
        self.prompts += 1;
        match self.next()? {
            Step::Line(line) => Ok(line.to_string()),
            other => panic!("expected a prompt line, script has {:?}", other),
        }
    }

    fn select(&mut self, _title: &str, options: &[String], _current: usize) -> Result<usize> {
        self.select_options.push(options.to_vec());
        match self.next()? {
            Step::Select(index) => Ok(index),
            other => panic!("expected a selection, script has {:?}", other),
        }
    }

    fn edit_settings(&mut self, fields: &[FormField]) -> Result<Vec<(String, String)>> {
        self.forms.push(fields.to_vec());
        match self.next()? {
            Step::Settings(values) => Ok(values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()),
            other => panic!("expected settings, script has {:?}", other),
        }
    }

    fn login_field(&mut self, _field: &LoginField) -> Result<String> {
        match self.next()? {
            Step::Field(value) => Ok(value),
            other => panic!("expected a login field, script has {:?}", other),
        }
    }

    fn show_images(&mut self, generation: &Generation) {
        self.shown.push(generation.clone());
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}
