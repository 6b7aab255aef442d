//! Login field declarations and collected credentials

use std::collections::BTreeMap;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// Input type of a login field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginFieldKind {
    /// Typed text
    String,
    /// Path to a file whose content becomes the value (as a blob)
    File,
}

/// One credential input a provider needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginField {
    pub name: String,
    pub display_name: String,
    pub kind: LoginFieldKind,
    /// Do not echo while typing
    pub secret: bool,
}

impl LoginField {
    pub fn text(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            kind: LoginFieldKind::String,
            secret: false,
        }
    }

    pub fn secret(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            secret: true,
            ..Self::text(name, display_name)
        }
    }

    pub fn file(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            kind: LoginFieldKind::File,
            ..Self::text(name, display_name)
        }
    }

    pub fn is_blob(&self) -> bool {
        self.kind == LoginFieldKind::File
    }
}

/// Flat field-name to value map handed to a provider.
///
/// File fields travel as base64 blobs so the map stays string-keyed and
/// string-valued. Use [`Credentials::insert_blob`] and [`Credentials::blob`]
/// for those. Values are wiped from memory on drop.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials(BTreeMap<String, String>);

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Store raw bytes base64-encoded
    pub fn insert_blob(&mut self, name: impl Into<String>, bytes: &[u8]) {
        self.0.insert(name.into(), BASE64.encode(bytes));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Value of a required field
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| Error::MissingCredential(name.to_string()))
    }

    /// Decoded bytes of a required blob field
    pub fn blob(&self, name: &str) -> Result<Vec<u8>> {
        BASE64.decode(self.require(name)?).map_err(|e| {
            Error::InvalidCredential(format!("field '{}' is not valid base64: {}", name, e))
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        for value in self.0.values_mut() {
            value.zeroize();
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Credentials {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
