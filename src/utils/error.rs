use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Iteration name `{name}` does not follow the `{prefix} <number>` convention")]
    MalformedName { name: String, prefix: String },

    #[error("Iterations overlap around {today}: {names:?}")]
    OverlappingIterations { today: NaiveDate, names: Vec<String> },

    #[error("Project `{project}` has iterations without start/finish dates: {undated:?}")]
    UnsupportedCalendarState { project: String, undated: Vec<String> },

    #[error("No iteration of project `{project}` covers {today}: none starts on or before it, or the calendar has a gap after it")]
    NoCurrentIteration { project: String, today: NaiveDate },

    #[error("Unable to create the iteration `{project} - {name}`")]
    IterationCreationFailed { project: String, name: String },

    #[error("Unable to assign iteration `{iteration}` to team `{team}`: {message}")]
    TeamAssignmentFailed {
        team: String,
        iteration: String,
        message: String,
    },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned {status} for {url}: {body}")]
    ApiStatusError {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Invalid date `{value}`")]
    DateError { value: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration value `{field}`")]
    MissingConfigError { field: String },

    #[error("Invalid value `{value}` for `{field}`: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Calendar,
    ExternalSystem,
    Configuration,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SyncError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::MalformedName { .. }
            | SyncError::OverlappingIterations { .. }
            | SyncError::UnsupportedCalendarState { .. }
            | SyncError::NoCurrentIteration { .. }
            | SyncError::DateError { .. } => ErrorCategory::Calendar,
            SyncError::IterationCreationFailed { .. }
            | SyncError::TeamAssignmentFailed { .. }
            | SyncError::ApiError(_)
            | SyncError::ApiStatusError { .. }
            | SyncError::SerializationError(_) => ErrorCategory::ExternalSystem,
            SyncError::UrlError(_)
            | SyncError::ConfigError { .. }
            | SyncError::MissingConfigError { .. }
            | SyncError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            SyncError::IoError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // The iteration exists, only the team link is missing.
            SyncError::TeamAssignmentFailed { .. } => ErrorSeverity::Low,
            SyncError::UrlError(_)
            | SyncError::ConfigError { .. }
            | SyncError::MissingConfigError { .. }
            | SyncError::InvalidConfigValueError { .. } => ErrorSeverity::Medium,
            SyncError::MalformedName { .. }
            | SyncError::OverlappingIterations { .. }
            | SyncError::UnsupportedCalendarState { .. }
            | SyncError::NoCurrentIteration { .. }
            | SyncError::DateError { .. } => ErrorSeverity::High,
            SyncError::IterationCreationFailed { .. }
            | SyncError::ApiError(_)
            | SyncError::ApiStatusError { .. }
            | SyncError::SerializationError(_)
            | SyncError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    /// Process exit code for a run that ended with this error.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            SyncError::MalformedName { .. } => {
                "Rename the iteration so it matches the configured prefix followed by a number"
            }
            SyncError::OverlappingIterations { .. } => {
                "Fix the iteration dates in Azure DevOps so that no two iterations overlap"
            }
            SyncError::UnsupportedCalendarState { .. } => {
                "Set start and finish dates on every iteration of the project, then rerun"
            }
            SyncError::NoCurrentIteration { .. } => {
                "Close the gap in the iteration dates, or run with --today set to a date inside the calendar"
            }
            SyncError::IterationCreationFailed { .. } => {
                "Check that the token has permission to edit project iterations"
            }
            SyncError::TeamAssignmentFailed { .. } => {
                "Assign the iteration to the team manually in the team settings"
            }
            SyncError::ApiError(_) | SyncError::ApiStatusError { .. } => {
                "Check the Azure DevOps URI, the personal access token and network connectivity"
            }
            SyncError::SerializationError(_) => "Check that the URI points at an Azure DevOps organization",
            SyncError::DateError { .. } => "Use the YYYY-MM-DD date format",
            SyncError::UrlError(_)
            | SyncError::ConfigError { .. }
            | SyncError::MissingConfigError { .. }
            | SyncError::InvalidConfigValueError { .. } => {
                "Review the configuration file and command line flags"
            }
            SyncError::IoError(_) => "Check that the configuration file exists and is readable",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Calendar => format!("Iteration calendar problem: {}", self),
            ErrorCategory::ExternalSystem => format!("Azure DevOps request failed: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Io => format!("File access failed: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
