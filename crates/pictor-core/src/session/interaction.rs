//! Boundary between the session and whatever renders it

use crate::error::Result;
use crate::provider::{Generation, LoginField};
use crate::settings::FormField;

/// User-facing side of a session.
///
/// Every method that waits for input returns [`Error::UserCancelled`] when
/// the user aborts (Ctrl-C, Ctrl-D). Callers treat that as an exit, not a
/// failure.
///
/// [`Error::UserCancelled`]: crate::Error::UserCancelled
pub trait Interaction {
    /// Read one line of input; `model` names the active model
    fn prompt(&mut self, model: &str) -> Result<String>;

    /// Pick one of `options`, returning its index. `current` is preselected.
    fn select(&mut self, title: &str, options: &[String], current: usize) -> Result<usize>;

    /// Edit a settings form, returning `(name, value)` for every field the
    /// user confirmed. Values are validated again by the caller.
    fn edit_settings(&mut self, fields: &[FormField]) -> Result<Vec<(String, String)>>;

    /// Ask for one credential field. For file fields the answer is a path.
    fn login_field(&mut self, field: &LoginField) -> Result<String>;

    /// Present freshly generated images
    fn show_images(&mut self, generation: &Generation);

    /// One-line status message
    fn notify(&mut self, message: &str);
}
