//! Error types for the flight search client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the route does not exist" from "the server returned an unexpected
//! status." All other non-2xx responses land in `HttpError` with the raw
//! status code and body for debugging. Validation failures carry every
//! offending field so the caller can report them together.

use std::fmt;

use thiserror::Error;

/// Errors returned by the client, the cache, and the service layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Outbound flight-search parameters failed validation. Raised before
    /// any network call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The upstream envelope reported failure and carried no payload.
    #[error("upstream reported failure: {message}")]
    Upstream { message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// A payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The request never produced an HTTP response (DNS, connect, TLS,
    /// malformed URL).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The local key-value store could not be read or written.
    #[error("storage failed: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// A single rejected field and the reason it was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub message: String,
}

/// Every field that failed validation for one request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    /// Names of the rejected fields, in the order they were checked.
    pub fn fields(&self) -> Vec<&'static str> {
        self.issues.iter().map(|issue| issue.field).collect()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid search parameters: ")?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", issue.field, issue.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_field() {
        let err = ValidationError {
            issues: vec![
                FieldIssue {
                    field: "adults",
                    message: "must be at least 1".to_string(),
                },
                FieldIssue {
                    field: "cabinClass",
                    message: "unknown cabin class \"luxury\"".to_string(),
                },
            ],
        };
        assert_eq!(err.fields(), vec!["adults", "cabinClass"]);
        assert_eq!(
            err.to_string(),
            "invalid search parameters: adults: must be at least 1; cabinClass: unknown cabin class \"luxury\""
        );
    }

    #[test]
    fn api_error_wraps_validation_transparently() {
        let err: ApiError = ValidationError {
            issues: vec![FieldIssue {
                field: "departDate",
                message: "is required".to_string(),
            }],
        }
        .into();
        assert_eq!(err.to_string(), "invalid search parameters: departDate: is required");
    }
}
