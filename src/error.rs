//! Error types for release pipeline operations.
//!
//! Lower layers return these errors and never print them. Only the top-level
//! entry point decides how a failure is presented, using
//! [`ReleaseError::recovery_suggestions`] for actionable hints.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for release pipeline operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all release pipeline operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Command line could not be parsed
    #[error("{}", .0.render().to_string().trim_end())]
    Usage(#[from] clap::Error),

    /// Configuration errors (missing token, bad project file, ...)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors reported by (or while talking to) the release service
    #[error("Release service error: {0}")]
    Remote(#[from] RemoteError),

    /// CLI and phase execution errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The whole run exceeded its deadline
    #[error("command timed out after {}; increase --timeout if needed", humanize(*timeout))]
    Timeout {
        /// The deadline that elapsed
        timeout: Duration,
    },

    /// The run was cancelled before it could finish
    #[error("command was cancelled")]
    Cancelled,

    /// An unexpected runtime fault caught at the outermost boundary
    #[error("unexpected fault: {message}")]
    Panic {
        /// Panic payload rendered as text
        message: String,
        /// Backtrace captured when the fault happened
        backtrace: String,
    },
}

/// Configuration errors. Always fatal, never retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No access token available for the live client
    #[error("missing access token; set the {var} environment variable")]
    MissingToken {
        /// Environment variable that was consulted first
        var: &'static str,
    },

    /// Access token cannot be sent as an HTTP header value
    #[error("access token contains characters not allowed in an HTTP header")]
    InvalidToken,

    /// Release service type other than the supported one
    #[error("unsupported release service type '{service}'; only 'github' is supported for now")]
    UnsupportedService {
        /// Service type as given in the project file
        service: String,
    },

    /// Project file could not be found
    #[error("project file not found at {path}")]
    ProjectFileNotFound {
        /// Path that was tried
        path: PathBuf,
    },

    /// Project file content is invalid
    #[error("invalid project configuration: {reason}")]
    Invalid {
        /// Reason for the error
        reason: String,
    },

    /// Release notes file could not be read
    #[error("cannot read release notes file {path}: {source}")]
    ReleaseNotes {
        /// Path to the release notes file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// An artifact path has no usable file name
    #[error("invalid artifact path {path}")]
    InvalidArtifactPath {
        /// Offending path
        path: PathBuf,
    },
}

/// Errors from the release publishing client.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// This specific attempt may succeed if retried
    #[error("temporary failure: {0}")]
    Temporary(#[source] Box<RemoteError>),

    /// The service answered with a status we did not expect
    #[error("{operation}: unexpected status code: {status}{}", body_suffix(body))]
    UnexpectedStatus {
        /// Operation that was attempted
        operation: &'static str,
        /// HTTP status returned
        status: u16,
        /// Response body, if any
        body: String,
    },

    /// The request never produced a response
    #[error("{operation}: request failed: {source}")]
    Transport {
        /// Operation that was attempted
        operation: &'static str,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// Uploading against a release that was not created by this client in this run
    #[error("release id mismatch: expected {expected}, got {actual}")]
    ReleaseIdMismatch {
        /// Identifier the client knows about
        expected: String,
        /// Identifier passed by the caller
        actual: String,
    },

    /// No asset file was supplied to an upload
    #[error("no asset file supplied")]
    MissingAsset,

    /// Retryable failures kept happening until the attempt budget ran out
    #[error("{operation} failed after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        /// Operation that was retried
        operation: String,
        /// Number of attempts made
        attempts: u32,
        /// Last error observed
        #[source]
        last: Box<ReleaseError>,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl RemoteError {
    /// Wrap this error as a temporary failure
    pub fn temporary(self) -> Self {
        match self {
            RemoteError::Temporary(_) => self,
            other => RemoteError::Temporary(Box::new(other)),
        }
    }
}

impl ReleaseError {
    /// Whether this error signals a failure that may succeed on retry
    pub fn is_temporary(&self) -> bool {
        matches!(self, ReleaseError::Remote(RemoteError::Temporary(_)))
    }

    /// Whether this error came from the deadline or a cancellation
    pub fn is_timeout(&self) -> bool {
        matches!(self, ReleaseError::Timeout { .. } | ReleaseError::Cancelled)
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ReleaseError::Usage(e) => e.exit_code(),
            _ => 1,
        }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Usage(_) => Vec::new(),
            ReleaseError::Config(ConfigError::MissingToken { var }) => vec![
                format!("Export a token with repo scope: export {var}=<token>"),
                "Use --try to exercise the pipeline without publishing".to_string(),
            ],
            ReleaseError::Config(ConfigError::InvalidToken) => vec![
                "Check the token for stray newlines or quotes".to_string(),
            ],
            ReleaseError::Config(ConfigError::ProjectFileNotFound { .. }) => vec![
                "Run from the project root or pass --config <path>".to_string(),
            ],
            ReleaseError::Timeout { .. } => vec![
                "Increase the time budget with --timeout <seconds>".to_string(),
                "Check network connectivity to the release service".to_string(),
            ],
            ReleaseError::Remote(RemoteError::RetriesExhausted { .. }) => vec![
                format!(
                    "Raise the attempt budget with {}",
                    crate::cli::RetryConfig::ATTEMPTS_VAR
                ),
                "Check https://www.githubstatus.com for service incidents".to_string(),
            ],
            ReleaseError::Panic { .. } => vec![
                "This is a bug; please report it with the backtrace above".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" ({})", body.trim())
    }
}

fn humanize(d: Duration) -> String {
    crate::cli::format_duration(d)
}
