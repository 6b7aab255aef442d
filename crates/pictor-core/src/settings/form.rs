//! Form descriptions for interactive settings editing
//!
//! The terminal layer renders these; this module only decides which widget
//! fits each setting and how candidate values are validated.

use super::schema::{Setting, SettingKind};

/// Enumerations with at most this many variants render as a selector;
/// larger ones as a suggest-and-validate text field.
pub const SELECT_THRESHOLD: usize = 8;

/// How a field is presented
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Widget {
    /// Free text entry
    Text,
    /// Pick one of the options
    Select { options: Vec<String> },
    /// Free text with completion suggestions
    Suggest { options: Vec<String> },
}

/// One interactive field of a settings form
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub label: String,
    /// Value shown initially
    pub value: String,
    pub kind: SettingKind,
    pub widget: Widget,
}

impl FormField {
    /// Describe the field for `setting`; enumerations without variants have none
    pub fn for_setting(setting: &Setting) -> Option<Self> {
        let widget = match &setting.kind {
            SettingKind::Int { .. } | SettingKind::Float | SettingKind::Text => Widget::Text,
            SettingKind::Boolean => Widget::Select {
                options: vec!["true".to_string(), "false".to_string()],
            },
            SettingKind::Enum { variants } if variants.is_empty() => return None,
            SettingKind::Enum { variants } if variants.len() <= SELECT_THRESHOLD => {
                Widget::Select {
                    options: variants.clone(),
                }
            }
            SettingKind::Enum { variants } => Widget::Suggest {
                options: variants.clone(),
            },
        };

        Some(Self {
            name: setting.name.clone(),
            label: setting.display_name.clone(),
            value: setting.value.clone(),
            kind: setting.kind.clone(),
            widget,
        })
    }

    /// Validate a candidate value, returning a message for the user
    pub fn validate(&self, candidate: &str) -> Result<(), String> {
        if matches!(self.kind, SettingKind::Text) && candidate.trim().is_empty() {
            return Err("must not be empty".to_string());
        }
        self.kind.check(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ModelSettings;

    fn variants(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("v{}", i)).collect()
    }

    #[test]
    fn test_widget_selection() {
        let text = Setting::new("n", "N", SettingKind::int(), "1");
        assert_eq!(FormField::for_setting(&text).unwrap().widget, Widget::Text);

        let boolean = Setting::new("b", "B", SettingKind::Boolean, "false");
        assert!(matches!(
            FormField::for_setting(&boolean).unwrap().widget,
            Widget::Select { options } if options == ["true", "false"]
        ));

        let small = Setting::new("e", "E", SettingKind::enumeration(variants(8)), "v0");
        assert!(matches!(
            FormField::for_setting(&small).unwrap().widget,
            Widget::Select { .. }
        ));

        let large = Setting::new("e", "E", SettingKind::enumeration(variants(9)), "v0");
        assert!(matches!(
            FormField::for_setting(&large).unwrap().widget,
            Widget::Suggest { options } if options.len() == 9
        ));

        let empty = Setting::new("e", "E", SettingKind::enumeration(Vec::<String>::new()), "");
        assert!(FormField::for_setting(&empty).is_none());
    }

    #[test]
    fn test_form_seeds_values_from_defaults() {
        let mut settings = ModelSettings::new(vec![
            Setting::new("n", "Count", SettingKind::int(), "1"),
            Setting::new("s", "Style", SettingKind::Text, "").with_value("noir"),
        ]);
        let fields = settings.form();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].value, "1");
        assert_eq!(fields[1].value, "noir");
        assert_eq!(settings.get("n").unwrap().value, "1");
    }

    #[test]
    fn test_text_field_rejects_blank() {
        let field =
            FormField::for_setting(&Setting::new("s", "Style", SettingKind::Text, "")).unwrap();
        assert!(field.validate("  ").is_err());
        assert!(field.validate("noir").is_ok());
    }
}
