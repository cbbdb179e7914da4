//! Error types for Claimlens

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClaimlensError>;

/// Main error type for Claimlens
///
/// Display strings double as wire-facing messages: `/query` puts
/// `to_string()` of these straight into its JSON error envelope.
#[derive(Error, Debug)]
pub enum ClaimlensError {
    #[error("Configuration error: {0}")]
    Config(String),

    // No prefix: validation messages are client-facing verbatim
    #[error("{0}")]
    Validation(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Asset error: {0}")]
    Asset(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_errors_carry_the_driver_message() {
        let err = ClaimlensError::Query("connection refused".to_string());
        assert_eq!(err.to_string(), "Query failed: connection refused");
    }

    #[test]
    fn test_request_errors_carry_the_parse_message() {
        let err = ClaimlensError::Request("expected value at line 1".to_string());
        assert_eq!(
            err.to_string(),
            "Request failed: expected value at line 1"
        );
    }

    #[test]
    fn test_validation_errors_are_verbatim() {
        let err = ClaimlensError::Validation("creator address is required".to_string());
        assert_eq!(err.to_string(), "creator address is required");
    }
}
