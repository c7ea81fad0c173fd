//! Domain-level error types for chat-export.
//!
//! All errors are typed with `thiserror`. Validation failures are local and
//! never reach the backend; submission and poll failures are classified so the
//! caller can report them without inspecting transport details.

use thiserror::Error;

/// Local, pre-submission validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Output folder or filename is empty.
    #[error("Output folder and filename must both be set")]
    EmptyPath,

    /// Named Notion destination is not saved (or is missing its key/parent).
    #[error("Unknown Notion destination: {name}")]
    UnknownDestination { name: String },

    /// Destination kind is neither folder nor Notion.
    #[error("Unknown destination kind: {kind}. Use: folder, notion")]
    UnknownDestinationKind { kind: String },

    /// Chat / channel reference is empty.
    #[error("Chat or channel must not be empty")]
    EmptyChat,

    /// Platform credentials are malformed.
    #[error("Invalid credentials: {message}")]
    InvalidCredentials { message: String },

    /// Both "only media" and "only text" were requested.
    #[error("Only media and only text cannot both be set")]
    ConflictingContentFilter,

    /// Limit is not a positive integer.
    #[error("Limit must be a positive integer, got: {value}")]
    InvalidLimit { value: String },

    /// Minimum date is after maximum date.
    #[error("Min date {min} is after max date {max}")]
    InvalidDateRange {
        min: chrono::NaiveDate,
        max: chrono::NaiveDate,
    },
}

/// Failure to submit a job. No task handle exists after any of these.
#[derive(Error, Debug)]
pub enum SubmissionError {
    /// Backend could not be reached.
    #[error("Backend unreachable: {message}")]
    Network { message: String },

    /// Backend refused the job; `detail` is passed through verbatim.
    #[error("Backend rejected the job: {detail}")]
    Rejected { detail: String },

    /// Anything else (unexpected response shape, etc.).
    #[error("Submission failed: {message}")]
    Unknown { message: String },
}

/// Failure while polling a job's status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    /// Backend could not be reached.
    #[error("Backend unreachable: {message}")]
    Network { message: String },

    /// Backend answered with an error status (e.g. task not found).
    #[error("Status request rejected: {detail}")]
    Rejected { detail: String },

    /// Snapshot could not be decoded.
    #[error("Malformed status snapshot: {message}")]
    Malformed { message: String },
}

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// Input did not pass validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Job could not be submitted.
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// Job status could not be polled.
    #[error(transparent)]
    Poll(#[from] PollError),

    /// Auxiliary backend call failed (tests, searches, config).
    #[error("Backend error: {message}")]
    Backend { message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create an auxiliary backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
