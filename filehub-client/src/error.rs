use thiserror::Error;

/// Errors that can occur when using the filehub client
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server already holds this upload (status 409)
    #[error("conflict: {}", .detail.as_deref().unwrap_or("file already exists"))]
    Conflict { detail: Option<String> },

    /// Requested file does not exist (status 404)
    #[error("not found: {}", .detail.as_deref().unwrap_or("no such file"))]
    NotFound { detail: Option<String> },

    /// Server failed to process the request (status 500)
    #[error("server error: {}", .detail.as_deref().unwrap_or("internal server error"))]
    ServerError { detail: Option<String> },

    /// Any other non-2xx status
    #[error("request failed with status {status}{}", fmt_detail(.detail))]
    RequestFailed { status: u16, detail: Option<String> },

    /// Download returned a status other than 2xx, 404 or 500
    #[error("download failed with status {status}")]
    DownloadFailed { status: u16 },

    /// No response was received
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Error when parsing URLs
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// Base URL is not an http(s) URL usable as a base
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Error when parsing JSON
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Local file system error (reading uploads, saving downloads)
    #[error("file system error: {0}")]
    FileSystemError(String),
}

fn fmt_detail(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(": {}", d),
        None => String::new(),
    }
}

/// Coarse classification of an [`ApiError`], used by callers that only need to
/// branch on the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Conflict,
    NotFound,
    ServerError,
    RequestFailed,
    DownloadFailed,
    NetworkError,
    Other,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Conflict { .. } => ErrorKind::Conflict,
            ApiError::NotFound { .. } => ErrorKind::NotFound,
            ApiError::ServerError { .. } => ErrorKind::ServerError,
            ApiError::RequestFailed { .. } => ErrorKind::RequestFailed,
            ApiError::DownloadFailed { .. } => ErrorKind::DownloadFailed,
            ApiError::NetworkError(_) => ErrorKind::NetworkError,
            ApiError::UrlParseError(_)
            | ApiError::InvalidBaseUrl(_)
            | ApiError::JsonError(_)
            | ApiError::FileSystemError(_) => ErrorKind::Other,
        }
    }

    /// Server supplied detail message, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Conflict { detail }
            | ApiError::NotFound { detail }
            | ApiError::ServerError { detail }
            | ApiError::RequestFailed { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

/// Result type for filehub client operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Which status mapping applies to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Upload,
    Query,
    Download,
}

/// Pulls a human readable message out of an error body. The server answers
/// with `{"detail": ..}` or `{"error": ..}`, anything else is taken verbatim.
pub(crate) fn extract_detail(body: &[u8]) -> Option<String> {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice::<serde_json::Value>(body) {
        for key in ["detail", "error"] {
            match map.get(key) {
                Some(serde_json::Value::String(s)) => return Some(s.clone()),
                Some(serde_json::Value::Null) | None => {}
                Some(other) => return Some(other.to_string()),
            }
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Maps a non-2xx status to the error taxonomy of the given operation.
pub(crate) fn map_status(op: Operation, status: u16, body: &[u8]) -> ApiError {
    match (op, status) {
        (Operation::Upload, 409) => ApiError::Conflict {
            detail: extract_detail(body),
        },
        (Operation::Upload, _) => ApiError::RequestFailed {
            status,
            detail: extract_detail(body),
        },
        (_, 404) => ApiError::NotFound {
            detail: extract_detail(body),
        },
        (_, 500) => ApiError::ServerError {
            detail: extract_detail(body),
        },
        (Operation::Download, _) => ApiError::DownloadFailed { status },
        (Operation::Query, _) => ApiError::RequestFailed {
            status,
            detail: extract_detail(body),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_conflict() {
        let err = map_status(Operation::Upload, 409, br#"{"detail": "duplicate"}"#);
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.detail(), Some("duplicate"));
    }

    #[test]
    fn upload_other_status_is_request_failed() {
        // upload has no dedicated 404/500 mapping
        for status in [400, 404, 500, 503] {
            let err = map_status(Operation::Upload, status, b"");
            match err {
                ApiError::RequestFailed { status: s, detail } => {
                    assert_eq!(s, status);
                    assert_eq!(detail, None);
                }
                other => panic!("unexpected error {:?}", other),
            }
        }
    }

    #[test]
    fn download_statuses() {
        assert_eq!(
            map_status(Operation::Download, 404, b"").kind(),
            ErrorKind::NotFound
        );

        let err = map_status(Operation::Download, 500, br#"{"detail": "disk gone"}"#);
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.detail(), Some("disk gone"));

        let err = map_status(Operation::Download, 403, b"nope");
        assert!(matches!(err, ApiError::DownloadFailed { status: 403 }));
        assert_eq!(err.detail(), None);
    }

    #[test]
    fn query_statuses() {
        assert_eq!(map_status(Operation::Query, 404, b"").kind(), ErrorKind::NotFound);
        assert_eq!(
            map_status(Operation::Query, 500, b"").kind(),
            ErrorKind::ServerError
        );
        assert_eq!(
            map_status(Operation::Query, 400, b"").kind(),
            ErrorKind::RequestFailed
        );
    }

    #[test]
    fn detail_extraction() {
        assert_eq!(
            extract_detail(br#"{"error": "No file provided"}"#).as_deref(),
            Some("No file provided")
        );
        assert_eq!(
            extract_detail(br#"{"detail": null, "error": "x"}"#).as_deref(),
            Some("x")
        );
        assert_eq!(extract_detail(b"  plain text \n").as_deref(), Some("plain text"));
        assert_eq!(extract_detail(b"   "), None);
        assert_eq!(extract_detail(br#"{"other": 1}"#).as_deref(), Some(r#"{"other": 1}"#));
    }

    #[test]
    fn display() {
        let err = ApiError::RequestFailed {
            status: 400,
            detail: Some("bad".into()),
        };
        assert_eq!(err.to_string(), "request failed with status 400: bad");
        let err = ApiError::ServerError { detail: None };
        assert_eq!(err.to_string(), "server error: internal server error");
    }
}
