//! Error types for field-monitor services.

use thiserror::Error;

/// Result type alias using AgroError.
pub type AgroResult<T> = Result<T, AgroError>;

/// Primary error type for field-monitor operations.
#[derive(Debug, Error)]
pub enum AgroError {
    // === Request Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Field has no coordinates: {0}")]
    MissingCoordinates(String),

    // === Auth Errors ===
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Not authorized for field: {0}")]
    Forbidden(String),

    // === Provider Errors ===
    #[error("Provider '{provider}' is disabled")]
    ProviderDisabled { provider: String },

    #[error("Provider '{provider}' request failed: {message}")]
    ProviderRequest { provider: String, message: String },

    #[error("Provider '{provider}' returned malformed payload: {message}")]
    ProviderPayload { provider: String, message: String },

    #[error("Provider '{provider}' authentication failed: {message}")]
    ProviderAuth { provider: String, message: String },

    // === Storage Errors ===
    #[error("Database error: {0}")]
    DatabaseError(String),

    // === Infrastructure Errors ===
    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Request timeout")]
    Timeout,
}

impl AgroError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            AgroError::MissingParameter(_) | AgroError::InvalidParameter { .. } => 400,

            AgroError::Unauthenticated => 401,
            AgroError::Forbidden(_) => 403,

            AgroError::FieldNotFound(_) | AgroError::MissingCoordinates(_) => 404,

            AgroError::Timeout => 504,

            _ => 500,
        }
    }

    /// Whether this error originated at an external provider boundary.
    ///
    /// Provider errors are substituted with synthetic fallback data rather
    /// than surfaced to the caller.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            AgroError::ProviderDisabled { .. }
                | AgroError::ProviderRequest { .. }
                | AgroError::ProviderPayload { .. }
                | AgroError::ProviderAuth { .. }
        )
    }
}

// Conversion from common error types
impl From<std::io::Error> for AgroError {
    fn from(err: std::io::Error) -> Self {
        AgroError::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for AgroError {
    fn from(err: serde_json::Error) -> Self {
        AgroError::InternalError(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AgroError::Unauthenticated.http_status_code(), 401);
        assert_eq!(AgroError::Forbidden("f1".into()).http_status_code(), 403);
        assert_eq!(AgroError::FieldNotFound("f1".into()).http_status_code(), 404);
        assert_eq!(
            AgroError::DatabaseError("down".into()).http_status_code(),
            500
        );
    }

    #[test]
    fn test_provider_error_classification() {
        let err = AgroError::ProviderRequest {
            provider: "eosda".into(),
            message: "connection refused".into(),
        };
        assert!(err.is_provider_error());
        assert!(!AgroError::Unauthenticated.is_provider_error());
    }
}
