//! Error types for form schema resolution, validation and validator loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors during schema/overlay resolution.
///
/// Resolution is all-or-nothing: any of these aborts the call and no
/// partially resolved schema or descriptor tree is returned.
#[derive(Debug, Error)]
pub enum ResolveError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    // Schema errors (exit code 2)
    #[error("could not find a definition for {reference} at {path}")]
    MissingDefinition { path: String, reference: String },

    #[error("circular reference {reference} at {path}")]
    CircularReference { path: String, reference: String },

    #[error("unknown type \"{value}\" at {path}")]
    UnknownType { path: String, value: String },

    #[error("no widget mapped for format \"{format}\" at {path}")]
    UnknownFormat { path: String, format: String },

    #[error("invalid overlay at {path}: expected {expected}, got {actual}")]
    InvalidOverlay {
        path: String,
        expected: &'static str,
        actual: String,
    },

    #[error("if: properties does not contain '{key}' at {path}")]
    ConditionKey { path: String, key: String },

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::FileNotFound { .. } | ResolveError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            ResolveError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Failure of the external validator library load.
///
/// Only surfaced to whoever requested the load; it never affects schema
/// resolution.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("the validator library failed to load ({library}): {message}")]
    Failed { library: String, message: String },
}

/// Errors during form data validation.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<SchemaError> },
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Resolve(e) => e.exit_code(),
            ValidateError::Invalid { .. } => 1,
        }
    }
}

/// Single validation error with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_error_exit_codes() {
        let err = ResolveError::FileNotFound {
            path: PathBuf::from("schema.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = ResolveError::MissingDefinition {
            path: "/properties/user".into(),
            reference: "#/definitions/user".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err = ResolveError::InvalidOverlay {
            path: "/$name".into(),
            expected: "object",
            actual: "number".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn validate_error_exit_codes() {
        let err = ValidateError::Invalid {
            errors: vec![SchemaError {
                path: "/name".into(),
                message: "missing required field".into(),
            }],
        };
        assert_eq!(err.exit_code(), 1);

        let err = ValidateError::from(ResolveError::InvalidSchema {
            message: "root must be an object".into(),
        });
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn condition_key_message() {
        let err = ResolveError::ConditionKey {
            path: "/if".into(),
            key: "kind".into(),
        };
        assert_eq!(err.to_string(), "if: properties does not contain 'kind' at /if");
    }

    #[test]
    fn load_error_names_library() {
        let err = LoadError::Failed {
            library: "validator.js".into(),
            message: "timeout".into(),
        };
        assert!(err.to_string().contains("validator.js"));
    }
}
