//! Prompt-line dispatch table

/// Where the session goes after reading a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingPrompt,
    Generating,
    EditingModel,
    EditingSettings,
    Exiting,
}

/// Slash commands understood at the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Models,
    Settings,
    Exit,
    Retry,
}

/// Every slash command and its spelling
pub const COMMANDS: &[(&str, Command)] = &[
    ("/models", Command::Models),
    ("/settings", Command::Settings),
    ("/exit", Command::Exit),
    ("/retry", Command::Retry),
];

impl Command {
    pub fn lookup(word: &str) -> Option<Self> {
        COMMANDS
            .iter()
            .find(|(spelling, _)| *spelling == word)
            .map(|(_, command)| *command)
    }

    pub fn transition(self) -> SessionState {
        match self {
            Self::Models => SessionState::EditingModel,
            Self::Settings => SessionState::EditingSettings,
            Self::Exit => SessionState::Exiting,
            Self::Retry => SessionState::Generating,
        }
    }
}

/// One classified prompt line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Blank,
    Command(Command),
    /// Starts with `/` but names no command
    Invalid(String),
    Prompt(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            Self::Blank
        } else if line.starts_with('/') {
            Command::lookup(line)
                .map(Self::Command)
                .unwrap_or_else(|| Self::Invalid(line.to_string()))
        } else {
            Self::Prompt(line.to_string())
        }
    }

    /// State this input leads to
    pub fn transition(&self) -> SessionState {
        match self {
            Self::Blank | Self::Invalid(_) => SessionState::AwaitingPrompt,
            Self::Command(command) => command.transition(),
            Self::Prompt(_) => SessionState::Generating,
        }
    }
}
