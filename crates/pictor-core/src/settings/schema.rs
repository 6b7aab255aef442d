//! Setting schema: one configurable parameter and its type

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Prefix of the enumerated type tag (`enum:<a>|<b>|...`)
const ENUM_PREFIX: &str = "enum:";

/// Type of a setting
///
/// The external form is a string tag (`int`, `float`, `string`, `boolean`,
/// `enum:<a>|<b>|...`), which is what serde reads and writes. Internally the
/// tag is parsed once into this variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SettingKind {
    /// Signed integer, optionally bounded (inclusive)
    Int { min: Option<i64>, max: Option<i64> },
    /// Floating point number
    Float,
    /// Free text
    Text,
    /// Literal `true` or `false`
    Boolean,
    /// One of a fixed set of variants
    Enum { variants: Vec<String> },
}

impl SettingKind {
    /// Unbounded integer
    pub const fn int() -> Self {
        Self::Int {
            min: None,
            max: None,
        }
    }

    /// Integer within `min..=max`
    pub const fn int_range(min: i64, max: i64) -> Self {
        Self::Int {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Enumeration over the given variants
    pub fn enumeration<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a type tag. Returns `None` for unknown tags.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "int" => Some(Self::int()),
            "float" => Some(Self::Float),
            "string" => Some(Self::Text),
            "boolean" => Some(Self::Boolean),
            _ => tag.strip_prefix(ENUM_PREFIX).map(|union| Self::Enum {
                variants: union
                    .split('|')
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect(),
            }),
        }
    }

    /// Whether `candidate` is a valid value of this type
    pub fn accepts(&self, candidate: &str) -> bool {
        self.check(candidate).is_ok()
    }

    /// Validate `candidate`, returning a user-facing message on failure
    pub fn check(&self, candidate: &str) -> Result<(), String> {
        match self {
            Self::Int { min, max } => {
                let n: i64 = candidate
                    .parse()
                    .map_err(|_| format!("'{}' is not a whole number", candidate))?;
                if let Some(min) = min {
                    if n < *min {
                        return Err(format!("must be at least {}", min));
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        return Err(format!("must be at most {}", max));
                    }
                }
                Ok(())
            }
            Self::Float => candidate
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| format!("'{}' is not a number", candidate)),
            Self::Text => Ok(()),
            Self::Boolean => match candidate {
                "true" | "false" => Ok(()),
                _ => Err("must be 'true' or 'false'".to_string()),
            },
            Self::Enum { variants } => {
                if variants.iter().any(|v| v == candidate) {
                    Ok(())
                } else if variants.is_empty() {
                    Err("no values are allowed".to_string())
                } else {
                    Err(format!("must be one of: {}", variants.join(", ")))
                }
            }
        }
    }
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int { .. } => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Text => write!(f, "string"),
            Self::Boolean => write!(f, "boolean"),
            Self::Enum { variants } => write!(f, "{}{}", ENUM_PREFIX, variants.join("|")),
        }
    }
}

impl TryFrom<String> for SettingKind {
    type Error = String;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        Self::parse(&tag).ok_or_else(|| format!("unknown model setting type: {:?}", tag))
    }
}

impl From<SettingKind> for String {
    fn from(kind: SettingKind) -> Self {
        kind.to_string()
    }
}

/// Check `candidate` against a string type tag.
///
/// Unknown tags are logged and treated as invalid.
pub fn is_of_type(candidate: &str, type_tag: &str) -> bool {
    match SettingKind::parse(type_tag) {
        Some(kind) => kind.accepts(candidate),
        None => {
            warn!(type_tag = %type_tag, "Unknown model setting type");
            false
        }
    }
}

/// One configurable parameter of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    /// Stable key
    pub name: String,
    /// Human-readable label
    pub display_name: String,
    #[serde(rename = "type")]
    pub kind: SettingKind,
    pub default_value: String,
    /// Current value, empty when unset
    #[serde(default)]
    pub value: String,
}

impl Setting {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        kind: SettingKind,
        default_value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            kind,
            default_value: default_value.into(),
            value: String::new(),
        }
    }

    /// Set the current value without validation
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Copy the default into an empty value
    pub fn seed_from_default(&mut self) {
        if self.value.is_empty() && !self.default_value.is_empty() {
            self.value = self.default_value.clone();
        }
    }

    /// The current value, or the declared default when unset
    pub fn current(&self) -> &str {
        if self.value.is_empty() {
            &self.default_value
        } else {
            &self.value
        }
    }
}
