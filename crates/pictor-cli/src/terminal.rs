//! Line-based terminal implementation of [`Interaction`]

use std::io::{self, IsTerminal, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use pictor_core::provider::{Generation, LoginField};
use pictor_core::session::Interaction;
use pictor_core::settings::{FormField, Widget};
use pictor_core::{Error, Result};
use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use crate::display;

/// What tab completion offers for the current line
enum Completion {
    Off,
    Options(Vec<String>),
    Files,
}

struct InputHelper {
    completion: Completion,
    files: FilenameCompleter,
}

impl Completer for InputHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        match &self.completion {
            Completion::Off => Ok((0, Vec::new())),
            Completion::Files => self.files.complete(line, pos, ctx),
            Completion::Options(options) => Ok((0, matching_options(options, &line[..pos]))),
        }
    }
}

impl Hinter for InputHelper {
    type Hint = String;
}

impl Highlighter for InputHelper {}

impl Validator for InputHelper {}

impl Helper for InputHelper {}

/// Options starting with `prefix`, ignoring case
fn matching_options(options: &[String], prefix: &str) -> Vec<Pair> {
    let prefix = prefix.to_lowercase();
    options
        .iter()
        .filter(|option| option.to_lowercase().starts_with(&prefix))
        .map(|option| Pair {
            display: option.clone(),
            replacement: option.clone(),
        })
        .collect()
}

/// Resolve a selection answer: a 1-based number, an option's text, or blank
/// for the current choice
fn parse_choice(answer: &str, options: &[String], current: usize) -> Option<usize> {
    let answer = answer.trim();
    if answer.is_empty() {
        return (current < options.len()).then_some(current);
    }
    if let Ok(number) = answer.parse::<usize>() {
        return (1..=options.len()).contains(&number).then(|| number - 1);
    }
    options.iter().position(|option| option == answer)
}

fn input_error(error: ReadlineError) -> Error {
    match error {
        ReadlineError::Interrupted | ReadlineError::Eof => Error::UserCancelled,
        ReadlineError::Io(e) => Error::Io(e),
        other => Error::Other(format!("terminal input failed: {}", other)),
    }
}

/// Restores cooked mode when dropped
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

pub struct Terminal {
    editor: Editor<InputHelper, DefaultHistory>,
}

impl Terminal {
    pub fn new() -> Result<Self> {
        let mut editor = Editor::new().map_err(input_error)?;
        editor.set_helper(Some(InputHelper {
            completion: Completion::Off,
            files: FilenameCompleter::new(),
        }));
        Ok(Self { editor })
    }

    fn read(&mut self, prompt: &str, initial: &str, completion: Completion) -> Result<String> {
        if let Some(helper) = self.editor.helper_mut() {
            helper.completion = completion;
        }
        self.editor
            .readline_with_initial(prompt, (initial, ""))
            .map_err(input_error)
    }

    /// Read until `check` accepts the answer
    fn read_valid(
        &mut self,
        prompt: &str,
        initial: &str,
        options: Option<&[String]>,
        check: impl Fn(&str) -> std::result::Result<(), String>,
    ) -> Result<String> {
        loop {
            let completion = match options {
                Some(options) => Completion::Options(options.to_vec()),
                None => Completion::Off,
            };
            let answer = self.read(prompt, initial, completion)?;
            let answer = answer.trim();
            match check(answer) {
                Ok(()) => return Ok(answer.to_string()),
                Err(message) => println!("  {}", message),
            }
        }
    }

    /// Read without echo, showing `*` per character
    fn read_secret(&mut self, label: &str) -> Result<String> {
        if !io::stdin().is_terminal() {
            return self.read(&format!("{}: ", label), "", Completion::Off);
        }

        let mut stdout = io::stdout();
        print!("{}: ", label);
        stdout.flush()?;

        let raw = RawMode::enable()?;
        let mut secret = String::new();
        loop {
            let Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) = event::read()?
            else {
                continue;
            };
            let ctrl = modifiers.contains(KeyModifiers::CONTROL);
            match code {
                KeyCode::Enter => break,
                KeyCode::Esc => return Err(Error::UserCancelled),
                KeyCode::Char('c') if ctrl => return Err(Error::UserCancelled),
                KeyCode::Char('d') if ctrl && secret.is_empty() => {
                    return Err(Error::UserCancelled);
                }
                KeyCode::Backspace => {
                    if secret.pop().is_some() {
                        print!("\x08 \x08");
                    }
                }
                KeyCode::Char(c) if !ctrl => {
                    secret.push(c);
                    print!("*");
                }
                _ => {}
            }
            stdout.flush()?;
        }
        drop(raw);
        println!();
        Ok(secret)
    }
}

impl Interaction for Terminal {
    fn prompt(&mut self, model: &str) -> Result<String> {
        let line = self.read(&format!("{} > ", model), "", Completion::Off)?;
        if !line.trim().is_empty() {
            let _ = self.editor.add_history_entry(line.as_str());
        }
        Ok(line)
    }

    fn select(&mut self, title: &str, options: &[String], current: usize) -> Result<usize> {
        println!("{}:", title);
        for (index, option) in options.iter().enumerate() {
            let marker = if index == current { '*' } else { ' ' };
            println!(" {} {:>2}) {}", marker, index + 1, option);
        }

        let initial = (current + 1).to_string();
        loop {
            let answer = self.read(
                "Choice: ",
                &initial,
                Completion::Options(options.to_vec()),
            )?;
            match parse_choice(&answer, options, current) {
                Some(index) => return Ok(index),
                None => println!("  Enter a number between 1 and {}", options.len()),
            }
        }
    }

    fn edit_settings(&mut self, fields: &[FormField]) -> Result<Vec<(String, String)>> {
        let mut values = Vec::with_capacity(fields.len());
        for field in fields {
            let value = match &field.widget {
                Widget::Select { options } => {
                    let current = options.iter().position(|o| *o == field.value).unwrap_or(0);
                    let index = self.select(&field.label, options, current)?;
                    options[index].clone()
                }
                Widget::Suggest { options } => self.read_valid(
                    &format!("{} ({}): ", field.label, field.kind),
                    &field.value,
                    Some(options.as_slice()),
                    |candidate| field.validate(candidate),
                )?,
                Widget::Text => self.read_valid(
                    &format!("{} ({}): ", field.label, field.kind),
                    &field.value,
                    None,
                    |candidate| field.validate(candidate),
                )?,
            };
            values.push((field.name.clone(), value));
        }
        Ok(values)
    }

    fn login_field(&mut self, field: &LoginField) -> Result<String> {
        loop {
            let answer = if field.secret {
                self.read_secret(&field.display_name)?
            } else if field.is_blob() {
                self.read(
                    &format!("{} (path): ", field.display_name),
                    "",
                    Completion::Files,
                )?
            } else {
                self.read(&format!("{}: ", field.display_name), "", Completion::Off)?
            };

            if !answer.trim().is_empty() {
                return Ok(answer);
            }
            println!("  {} must not be empty", field.display_name);
        }
    }

    fn show_images(&mut self, generation: &Generation) {
        for path in &generation.images {
            println!("{}", path.display());
            display::show(path);
        }
    }

    fn notify(&mut self, message: &str) {
        println!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<String> {
        ["1:1", "16:9", "4:3", "9:16", "3:4"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_parse_choice() {
        let options = options();
        assert_eq!(parse_choice("", &options, 2), Some(2));
        assert_eq!(parse_choice(" 2 ", &options, 0), Some(1));
        assert_eq!(parse_choice("9:16", &options, 0), Some(3));
        assert_eq!(parse_choice("0", &options, 0), None);
        assert_eq!(parse_choice("6", &options, 0), None);
        assert_eq!(parse_choice("2:1", &options, 0), None);
    }

    #[test]
    fn test_matching_options() {
        let options: Vec<String> = vec!["Imagen".into(), "image".into(), "other".into()];
        let matches: Vec<_> = matching_options(&options, "IMA")
            .into_iter()
            .map(|pair| pair.replacement)
            .collect();
        assert_eq!(matches, ["Imagen", "image"]);
        assert_eq!(matching_options(&options, "").len(), 3);
    }

    #[test]
    fn test_interrupts_are_user_cancellation() {
        assert!(matches!(
            input_error(ReadlineError::Interrupted),
            Error::UserCancelled
        ));
        assert!(matches!(input_error(ReadlineError::Eof), Error::UserCancelled));
    }
}
