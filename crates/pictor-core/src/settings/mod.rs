//! Self-describing model settings
//!
//! Providers describe each configurable parameter of a model as a [`Setting`]
//! and hand an ordered [`ModelSettings`] collection to the session. The session
//! renders it through the form layer and passes it back to the provider's
//! generate call, which reads it only through the typed accessors.

mod collection;
mod form;
mod schema;

pub use collection::ModelSettings;
pub use form::{FormField, SELECT_THRESHOLD, Widget};
pub use schema::{Setting, SettingKind, is_of_type};
