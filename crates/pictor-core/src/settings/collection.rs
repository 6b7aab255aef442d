//! Ordered settings collection bound to one model

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::form::FormField;
use super::schema::Setting;

/// Ordered settings of one model. Order is display order.
///
/// The typed accessors never fail: a missing or malformed value yields the
/// fallback described on each accessor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelSettings(Vec<Setting>);

impl ModelSettings {
    pub fn new(settings: Vec<Setting>) -> Self {
        Self(settings)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Setting> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Find a setting by name
    pub fn get(&self, name: &str) -> Option<&Setting> {
        self.0.iter().find(|s| s.name == name)
    }

    /// Validated value of a setting, with the declared default standing in
    /// for an empty or invalid stored value
    fn resolved(&self, name: &str) -> Option<&str> {
        let setting = self.get(name)?;
        let current = setting.current();
        if current.is_empty() || setting.kind.accepts(current) {
            return Some(current);
        }
        warn!(
            setting = %name,
            value = %current,
            default = %setting.default_value,
            "Invalid setting value, using declared default"
        );
        Some(&setting.default_value)
    }

    /// String value of `name`, or `default` if the setting is absent
    pub fn get_string(&self, name: &str, default: &str) -> String {
        match self.resolved(name) {
            Some(value) => {
                debug!(setting = %name, value = %value, "Reading setting");
                value.to_string()
            }
            None => {
                debug!(setting = %name, default = %default, "Setting absent, using default");
                default.to_string()
            }
        }
    }

    /// Parsed value of `name`. Unparsable values yield `default`; parsed values
    /// rejected by the setting's kind yield the declared default.
    fn parsed<T>(&self, name: &str, default: T) -> T
    where
        T: FromStr + Display + Copy,
    {
        let Some(setting) = self.get(name) else {
            return default;
        };
        let current = setting.current();
        let Ok(value) = current.parse::<T>() else {
            if !current.is_empty() {
                warn!(setting = %name, value = %current, default = %default, "Unparsable setting value, using default");
            }
            return default;
        };
        if setting.kind.accepts(current) {
            return value;
        }
        let declared = setting.default_value.parse().unwrap_or(default);
        warn!(
            setting = %name,
            value = %current,
            default = %declared,
            "Invalid setting value, using declared default"
        );
        declared
    }

    /// Integer value of `name`; `default` if absent or not an integer
    pub fn get_int(&self, name: &str, default: i64) -> i64 {
        self.parsed(name, default)
    }

    /// Float value of `name`; `default` if absent or not a number
    pub fn get_float(&self, name: &str, default: f64) -> f64 {
        self.parsed(name, default)
    }

    /// `true`/`false` for the literal strings; `default` for anything else
    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.get(name).map(Setting::current) {
            Some("true") => true,
            Some("false") => false,
            _ => default,
        }
    }

    /// Assign a validated value
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let setting = self
            .0
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::InvalidInput(format!("unknown setting '{}'", name)))?;
        setting
            .kind
            .check(value)
            .map_err(|msg| Error::InvalidInput(format!("{}: {}", setting.display_name, msg)))?;
        setting.value = value.to_string();
        Ok(())
    }

    /// Apply user defaults; values failing their setting's type are ignored
    pub fn apply_defaults(&mut self, defaults: &BTreeMap<String, String>) {
        for setting in &mut self.0 {
            let Some(value) = defaults.get(&setting.name) else {
                continue;
            };
            if setting.kind.accepts(value) {
                setting.value = value.clone();
            } else {
                warn!(
                    setting = %setting.name,
                    value = %value,
                    "Ignoring configured default that does not match the setting type"
                );
            }
        }
    }

    /// Seed empty values from defaults and describe one form field per setting
    pub fn form(&mut self) -> Vec<FormField> {
        self.0
            .iter_mut()
            .filter_map(|setting| {
                setting.seed_from_default();
                FormField::for_setting(setting)
            })
            .collect()
    }
}

impl From<Vec<Setting>> for ModelSettings {
    fn from(settings: Vec<Setting>) -> Self {
        Self(settings)
    }
}

impl<'a> IntoIterator for &'a ModelSettings {
    type Item = &'a Setting;
    type IntoIter = std::slice::Iter<'a, Setting>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
