use thiserror::Error;

/// Errors surfaced by the call-sign lookup cache.
///
/// Payloads are rendered strings so one failed initialization can be handed
/// to every caller that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage I/O error: {0}")]
    StorageIo(String),

    #[error("Failed to fetch callsign data: {reason}")]
    FetchFailed { status: Option<u16>, reason: String },

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl LookupError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        let reason = if truncated.is_empty() {
            format!("Status {}", status)
        } else {
            format!("Status {}: {}", status, truncated)
        };
        LookupError::FetchFailed {
            status: Some(status.as_u16()),
            reason,
        }
    }

    /// True when the failure happened while talking to the dataset source.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, LookupError::FetchFailed { .. })
    }
}

impl From<rusqlite::Error> for LookupError {
    fn from(err: rusqlite::Error) -> Self {
        LookupError::StorageIo(err.to_string())
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        LookupError::StorageIo(format!("Invalid metadata value: {}", err))
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        LookupError::FetchFailed {
            status: err.status().map(|s| s.as_u16()),
            reason: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for LookupError {
    fn from(err: tokio::task::JoinError) -> Self {
        LookupError::TaskFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LookupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_keeps_code() {
        let err = LookupError::from_status(reqwest::StatusCode::NOT_FOUND, "missing");
        match err {
            LookupError::FetchFailed { status, reason } => {
                assert_eq!(status, Some(404));
                assert!(reason.contains("missing"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_truncate_body() {
        let body = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = LookupError::truncate_body(&body);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.contains("truncated"));

        assert_eq!(LookupError::truncate_body("short"), "short");
    }

    #[test]
    fn test_truncate_body_respects_char_boundary() {
        let body = "é".repeat(MAX_ERROR_BODY_LENGTH);
        let truncated = LookupError::truncate_body(&body);
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn test_is_fetch_failure() {
        let fetch = LookupError::FetchFailed {
            status: None,
            reason: "offline".to_string(),
        };
        assert!(fetch.is_fetch_failure());
        assert!(!LookupError::StorageIo("disk".to_string()).is_fetch_failure());
    }
}
