//! Error types for the restore engine
//!
//! Selection-file problems abort an operation before any remote call is made.
//! Controller failures are captured per item inside a `BatchResult` and only
//! surface as errors from single-shot calls such as authentication or listing.

use std::fmt;

/// Main error type for the restore engine
#[derive(Debug)]
pub enum RestoreError {
    /// Persisted selection file is malformed
    Format(FormatError),

    /// Selection file could not be read or written
    Io(IoError),

    /// A controller call failed
    Remote(RemoteError),

    /// A group-parent back-reference does not resolve in the current snapshot
    DanglingReference {
        service_id: String,
        parent_id: String,
    },

    /// Configuration could not be loaded or is inconsistent
    Config(ConfigError),
}

/// Selection file format error variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Content is not valid JSON
    InvalidJson { reason: String },

    /// Top-level value is not a mapping of service ids to entries
    NotAMapping,

    /// An entry does not have the expected shape
    InvalidEntry { service_id: String, reason: String },

    /// A required field is absent or empty
    MissingField { service_id: String, field: String },
}

/// File system error while handling a selection file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoError {
    pub path: String,
    pub operation: String,
    pub reason: String,
}

/// Controller call error variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Transport-level failure reaching the controller
    Connection { reason: String },

    /// Controller answered with a non-success HTTP status
    Status { status: u16, body: String },

    /// Controller answered with something we could not interpret
    InvalidResponse { reason: String },

    /// Controller refused the request
    Rejected { message: String },

    /// No valid session for the call
    NotAuthenticated,

    /// The service is not known to the controller snapshot
    UnknownService { service_id: String },
}

/// Configuration error variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No controller system with this name is configured
    UnknownSystem { name: String },

    /// No system was named and no default is configured
    NoDefaultSystem,

    /// Credentials are missing for a system
    MissingCredentials { system: String },
}

impl fmt::Display for RestoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestoreError::Format(e) => write!(f, "Selection file format error: {}", e),
            RestoreError::Io(e) => write!(f, "I/O error: {}", e),
            RestoreError::Remote(e) => write!(f, "Controller error: {}", e),
            RestoreError::DanglingReference {
                service_id,
                parent_id,
            } => write!(
                f,
                "Service '{}' references group '{}' which is not in the current snapshot",
                service_id, parent_id
            ),
            RestoreError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::InvalidJson { reason } => write!(f, "invalid JSON: {}", reason),
            FormatError::NotAMapping => {
                write!(f, "expected a mapping of service ids to service entries")
            }
            FormatError::InvalidEntry { service_id, reason } => {
                write!(f, "entry '{}' is invalid: {}", service_id, reason)
            }
            FormatError::MissingField { service_id, field } => {
                write!(f, "entry '{}' is missing required field '{}'", service_id, field)
            }
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to {} '{}': {}", self.operation, self.path, self.reason)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Connection { reason } => write!(f, "connection failed: {}", reason),
            RemoteError::Status { status, body } => {
                write!(f, "controller returned status {}: {}", status, body)
            }
            RemoteError::InvalidResponse { reason } => write!(f, "invalid response: {}", reason),
            RemoteError::Rejected { message } => write!(f, "{}", message),
            RemoteError::NotAuthenticated => write!(f, "not authenticated"),
            RemoteError::UnknownService { service_id } => {
                write!(f, "service '{}' not found on controller", service_id)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownSystem { name } => write!(f, "unknown controller system '{}'", name),
            ConfigError::NoDefaultSystem => {
                write!(f, "no system given and no default_system configured")
            }
            ConfigError::MissingCredentials { system } => {
                write!(f, "no credentials configured for system '{}'", system)
            }
        }
    }
}

impl std::error::Error for RestoreError {}
impl std::error::Error for FormatError {}
impl std::error::Error for IoError {}
impl std::error::Error for RemoteError {}
impl std::error::Error for ConfigError {}

impl From<FormatError> for RestoreError {
    fn from(err: FormatError) -> Self {
        RestoreError::Format(err)
    }
}

impl From<IoError> for RestoreError {
    fn from(err: IoError) -> Self {
        RestoreError::Io(err)
    }
}

impl From<RemoteError> for RestoreError {
    fn from(err: RemoteError) -> Self {
        RestoreError::Remote(err)
    }
}

impl From<ConfigError> for RestoreError {
    fn from(err: ConfigError) -> Self {
        RestoreError::Config(err)
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::InvalidResponse {
                reason: err.to_string(),
            }
        } else {
            RemoteError::Connection {
                reason: err.to_string(),
            }
        }
    }
}

impl IoError {
    pub fn new(path: impl Into<String>, operation: &str, err: &std::io::Error) -> Self {
        Self {
            path: path.into(),
            operation: operation.to_string(),
            reason: err.to_string(),
        }
    }
}
