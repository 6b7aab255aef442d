//! Error types for pictor

use thiserror::Error;

/// Result type alias using pictor's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Pictor error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (E001-E099)
    #[error("Provider '{0}' not found.")]
    ProviderNotFound(String),

    #[error("No providers are available to log in to.")]
    NoProvidersAvailable,

    #[error("No model is available. Run `pictor auth login` to add a provider.")]
    NoModelAvailable,

    #[error("Invalid model identifier '{0}'. Expected '<provider>/<model>'.")]
    InvalidModelId(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Credential errors (E100-E199)
    #[error("Not logged in to {0}. Run `pictor auth login`.")]
    NotLoggedIn(String),

    #[error("Not logged in to any provider.")]
    NotLoggedInAnywhere,

    #[error("Credential field '{0}' not provided")]
    MissingCredential(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredential(String),

    #[error("Secret store error: {0}")]
    SecretStore(String),

    // Validation errors (E200-E299)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Backend errors (E300-E399)
    #[error("{provider}: {source}")]
    Backend {
        provider: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("Image generation failed: {0}")]
    ImageGenerationError(String),

    #[error("Unsupported image type: {0:?}")]
    UnsupportedImageType(String),

    #[error("No images were generated{}", filtered_suffix(.0))]
    NoImagesGenerated(Vec<String>),

    #[error("{operation} timed out after {secs} seconds")]
    Timeout { operation: &'static str, secs: u64 },

    // Interrupts (E700-E799)
    #[error("User cancelled operation")]
    UserCancelled,

    #[error("Operation cancelled")]
    Cancelled,

    // Generic errors
    #[error("{}", join_errors(.0))]
    Aggregate(Vec<Error>),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// How an error affects the command or session that hit it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Fatal to the current command
    Configuration,
    /// Reported; the operation aborts but a session continues
    Credential,
    /// Never fatal
    Validation,
    /// Reported; a session continues with the next prompt
    Backend,
    /// Treated as a clean exit
    Interrupt,
    Other,
}

impl Error {
    /// Wrap an error with the name of the provider it came from
    pub fn backend(provider: impl Into<String>, source: Error) -> Self {
        Self::Backend {
            provider: provider.into(),
            source: Box::new(source),
        }
    }

    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProviderNotFound(_) => "E001",
            Self::NoProvidersAvailable => "E002",
            Self::NoModelAvailable => "E003",
            Self::InvalidModelId(_) => "E004",
            Self::ConfigError(_) => "E005",
            Self::NotLoggedIn(_) => "E100",
            Self::NotLoggedInAnywhere => "E101",
            Self::MissingCredential(_) => "E102",
            Self::InvalidCredential(_) => "E103",
            Self::SecretStore(_) => "E104",
            Self::InvalidInput(_) => "E200",
            Self::Backend { .. } => "E300",
            Self::NetworkError(_) => "E301",
            Self::ImageGenerationError(_) => "E302",
            Self::UnsupportedImageType(_) => "E303",
            Self::NoImagesGenerated(_) => "E304",
            Self::Timeout { .. } => "E305",
            Self::UserCancelled => "E700",
            Self::Cancelled => "E701",
            Self::Aggregate(_) | Self::Other(_) | Self::Serialization(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NoModelAvailable | Self::NotLoggedIn(_) | Self::NotLoggedInAnywhere => {
                Some("pictor auth login".to_string())
            }
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::InvalidCredential(_) => {
                Some("pictor auth logout && pictor auth login".to_string())
            }
            Self::Backend { source, .. } => source.suggestion(),
            _ => None,
        }
    }

    /// Classify the error for the session loop
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderNotFound(_)
            | Self::NoProvidersAvailable
            | Self::NoModelAvailable
            | Self::InvalidModelId(_)
            | Self::ConfigError(_) => ErrorCategory::Configuration,
            Self::NotLoggedIn(_)
            | Self::NotLoggedInAnywhere
            | Self::MissingCredential(_)
            | Self::InvalidCredential(_)
            | Self::SecretStore(_) => ErrorCategory::Credential,
            Self::InvalidInput(_) => ErrorCategory::Validation,
            Self::Backend { source, .. } => match source.category() {
                ErrorCategory::Interrupt => ErrorCategory::Interrupt,
                ErrorCategory::Credential => ErrorCategory::Credential,
                _ => ErrorCategory::Backend,
            },
            Self::NetworkError(_)
            | Self::ImageGenerationError(_)
            | Self::UnsupportedImageType(_)
            | Self::NoImagesGenerated(_)
            | Self::Timeout { .. } => ErrorCategory::Backend,
            Self::UserCancelled | Self::Cancelled => ErrorCategory::Interrupt,
            Self::Aggregate(_) | Self::Other(_) | Self::Serialization(_) | Self::Io(_) => {
                ErrorCategory::Other
            }
        }
    }

    /// Whether this error means the user (or the process) asked to stop
    pub fn is_interrupt(&self) -> bool {
        self.category() == ErrorCategory::Interrupt
    }
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn filtered_suffix(reasons: &[String]) -> String {
    if reasons.is_empty() {
        String::new()
    } else {
        format!(" (filtered: {})", reasons.join("; "))
    }
}
