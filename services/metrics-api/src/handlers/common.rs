//! Shared handler plumbing: caller identity and error responses.

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

/// Header carrying the verified caller id, set by the gateway in front of
/// this service.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Build a JSON error response.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Extract the caller's user id, or fail with the 401 response.
pub fn caller_id(headers: &HeaderMap) -> Result<Uuid, Response> {
    let raw = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "Authentication required"))?;

    Uuid::parse_str(raw)
        .map_err(|_| error_response(StatusCode::UNAUTHORIZED, "Invalid user id header"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_caller_id_parses_uuid() {
        let mut headers = HeaderMap::new();
        let id = Uuid::new_v4();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(caller_id(&headers).unwrap(), id);
    }

    #[test]
    fn test_missing_header_rejected() {
        assert!(caller_id(&HeaderMap::new()).is_err());
    }

    #[test]
    fn test_garbage_header_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(caller_id(&headers).is_err());
    }
}
