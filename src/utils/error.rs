use thiserror::Error;

#[derive(Error, Debug)]
pub enum WizardError {
    #[error("Rate request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Rate provider error: {message}")]
    RateProviderError { message: String },

    #[error("Unknown item: {id}")]
    UnknownItem { id: String },

    #[error("Unknown currency: {code}")]
    UnknownCurrency { code: String },

    #[error("Currency {code} is unavailable for this session")]
    CurrencyLocked { code: String },

    #[error("State invariant violated: {message}")]
    InvariantViolation { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    State,
    Io,
}

impl WizardError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            WizardError::ApiError(_) | WizardError::RateProviderError { .. } => {
                ErrorCategory::Network
            }
            WizardError::IoError(_) => ErrorCategory::Io,
            WizardError::TomlError(_)
            | WizardError::ConfigError { .. }
            | WizardError::InvalidConfigValueError { .. }
            | WizardError::MissingConfigError { .. } => ErrorCategory::Configuration,
            WizardError::SerializationError(_)
            | WizardError::UnknownItem { .. }
            | WizardError::UnknownCurrency { .. }
            | WizardError::CurrencyLocked { .. }
            | WizardError::InvariantViolation { .. } => ErrorCategory::State,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check the rate endpoint and network connectivity",
            ErrorCategory::Configuration => "Fix the configuration file and try again",
            ErrorCategory::Io => "Check file paths and permissions",
            ErrorCategory::State => "Pick one of the listed options",
        }
    }
}

pub type Result<T> = std::result::Result<T, WizardError>;
