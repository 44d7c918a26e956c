//! Error taxonomy for Minicord API calls

use reqwest::StatusCode;

/// Failure of a single API request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Network or timeout failure before a response arrived.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Missing, expired or rejected token.
    #[error("unauthorized for {url} -- run 'minicord login'")]
    Unauthorized { url: String },

    #[error("not found: {url}")]
    NotFound { url: String },

    /// The server rejected the request body (400 / 422).
    #[error("validation failed: {message}")]
    Validation { status: u16, message: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("HTTP {status} for {url}: {body}")]
    Status { status: u16, url: String, body: String },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ApiError {
    /// Build an error from a non-success status and the response body.
    pub fn from_status(status: StatusCode, url: &str, body: String) -> Self {
        let url = url.to_string();
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized { url },
            StatusCode::NOT_FOUND => ApiError::NotFound { url },
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ApiError::Validation {
                status: status.as_u16(),
                message: body_message(&body),
            },
            StatusCode::CONFLICT => ApiError::Conflict {
                message: body_message(&body),
            },
            _ => ApiError::Status {
                status: status.as_u16(),
                url,
                body,
            },
        }
    }

    /// HTTP status behind this error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Transport { .. } | ApiError::Decode { .. } => None,
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Validation { status, .. } => Some(*status),
            ApiError::Conflict { .. } => Some(409),
            ApiError::Status { status, .. } => Some(*status),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

/// Pull a human-readable message out of an error body.
///
/// The API answers either with plain text or `{"message": "..."}` / `{"error": "..."}`.
fn body_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(s) = v.get(key).and_then(|m| m.as_str()) {
                return s.to_string();
            }
        }
    }
    body.trim().to_string()
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let e = ApiError::from_status(StatusCode::UNAUTHORIZED, "/users/self", String::new());
        assert!(matches!(e, ApiError::Unauthorized { .. }));
        assert_eq!(e.status(), Some(401));

        let e = ApiError::from_status(StatusCode::NOT_FOUND, "/users/by-username/x", String::new());
        assert!(e.is_not_found());

        let e = ApiError::from_status(
            StatusCode::CONFLICT,
            "/auth/signup",
            r#"{"message":"username taken"}"#.to_string(),
        );
        assert_eq!(e.to_string(), "conflict: username taken");

        let e = ApiError::from_status(StatusCode::BAD_GATEWAY, "/friends", "upstream".into());
        assert_eq!(e.to_string(), "HTTP 502 for /friends: upstream");
    }

    #[test]
    fn test_body_message_plain_text() {
        let e = ApiError::from_status(StatusCode::BAD_REQUEST, "/auth/signup", " too short \n".into());
        match e {
            ApiError::Validation { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "too short");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
