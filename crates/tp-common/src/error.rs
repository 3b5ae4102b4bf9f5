//! Error types for Topology Probes.

use thiserror::Error;

/// Result type alias for probe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for probe operations.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration/input errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing credential field: {field}")]
    MissingCredential { field: String },

    // Discovery errors (20-29)
    #[error("discovery failed: {0}")]
    Discovery(String),

    #[error("topology source unreadable: {0}")]
    SourceUnreadable(String),

    // Validation errors (30-39)
    #[error("target validation failed: {0}")]
    Validation(String),

    // Action errors (40-49)
    #[error("action execution failed: {0}")]
    ActionFailed(String),

    #[error("action timed out after {ticks} polls")]
    ActionTimeout { ticks: u32 },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the stable numeric code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::MissingCredential { .. } => 11,
            Error::Discovery(_) => 20,
            Error::SourceUnreadable(_) => 21,
            Error::Validation(_) => 30,
            Error::ActionFailed(_) => 40,
            Error::ActionTimeout { .. } => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::Config("x".into()).code(), 10);
        assert_eq!(
            Error::MissingCredential {
                field: "username".into()
            }
            .code(),
            11
        );
        assert_eq!(Error::Discovery("x".into()).code(), 20);
        assert_eq!(Error::ActionTimeout { ticks: 3 }.code(), 41);
    }

    #[test]
    fn display_includes_detail() {
        let err = Error::MissingCredential {
            field: "password".into(),
        };
        assert!(err.to_string().contains("password"));
        assert!(Error::ActionTimeout { ticks: 3 }.to_string().contains('3'));
    }
}
