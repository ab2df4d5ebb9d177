//! Error types for the analysis API client.
//!
//! Failures are categorised once, at the transport boundary, into a small
//! fixed set of kinds. Each kind carries the message shown to the user.

use thiserror::Error;

use crate::api::Endpoint;

/// Transport-level failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Server,
    Timeout,
    Network,
    Other,
}

impl ErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "Data not found. Please ensure the analysis has been completed.",
            ErrorKind::Server => "Server error. Please check if the backend is running.",
            ErrorKind::Timeout => "Request timeout. Please try again.",
            ErrorKind::Network => {
                "Network error. Please check your connection and ensure the backend server is running."
            }
            ErrorKind::Other => "Request failed.",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Server => "server",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Network => "network",
            ErrorKind::Other => "other",
        }
    }
}

/// Status codes with a dedicated category. Anything else passes through.
pub fn classify_status(status: u16) -> Option<ErrorKind> {
    match status {
        404 => Some(ErrorKind::NotFound),
        500..=u16::MAX => Some(ErrorKind::Server),
        _ => None,
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("{}", ErrorKind::NotFound.message())]
    NotFound,

    #[error("{}", ErrorKind::Server.message())]
    Server { status: u16 },

    #[error("{}", ErrorKind::Timeout.message())]
    Timeout,

    #[error("{}", ErrorKind::Network.message())]
    Network { detail: String },

    /// Non-categorised HTTP status, passed through unchanged
    #[error("Request failed with status code {status}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Io(String),
}

impl TransportError {
    /// Map an HTTP status through the classification table.
    pub fn from_status(status: u16, body: String) -> Self {
        match classify_status(status) {
            Some(ErrorKind::NotFound) => TransportError::NotFound,
            Some(ErrorKind::Server) => TransportError::Server { status },
            _ => TransportError::Status { status, body },
        }
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if let Some(status) = err.status() {
            TransportError::from_status(status.as_u16(), String::new())
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else if err.is_connect() || err.is_request() {
            TransportError::Network { detail: err.to_string() }
        } else {
            TransportError::Io(err.to_string())
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::NotFound => ErrorKind::NotFound,
            TransportError::Server { .. } => ErrorKind::Server,
            TransportError::Timeout => ErrorKind::Timeout,
            TransportError::Network { .. } => ErrorKind::Network,
            _ => ErrorKind::Other,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::NotFound => Some(404),
            TransportError::Server { status } | TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A transport failure tagged with the operation that produced it.
#[derive(Error, Debug)]
#[error("{}: {}", .endpoint.failure_label(), .source)]
pub struct ApiError {
    pub endpoint: Endpoint,
    #[source]
    pub source: TransportError,
}

impl ApiError {
    pub fn new(endpoint: Endpoint, source: TransportError) -> Self {
        Self { endpoint, source }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_404_is_not_found() {
        assert_eq!(classify_status(404), Some(ErrorKind::NotFound));
        let err = TransportError::from_status(404, String::new());
        assert_eq!(
            err.to_string(),
            "Data not found. Please ensure the analysis has been completed."
        );
    }

    #[test]
    fn test_every_5xx_and_above_is_server_error() {
        for status in [500u16, 501, 502, 503, 504, 599, 600, 999] {
            let err = TransportError::from_status(status, String::new());
            assert_eq!(err.kind(), ErrorKind::Server, "status {}", status);
            assert_eq!(err.to_string(), "Server error. Please check if the backend is running.");
            assert_eq!(err.status(), Some(status));
        }
    }

    #[test]
    fn test_other_statuses_pass_through() {
        for status in [400u16, 401, 403, 408, 429, 499] {
            assert_eq!(classify_status(status), None);
            let err = TransportError::from_status(status, "nope".to_string());
            assert_eq!(err.kind(), ErrorKind::Other);
            assert!(matches!(err, TransportError::Status { body, .. } if body == "nope"));
        }
    }

    #[test]
    fn test_timeout_and_network_messages() {
        assert_eq!(TransportError::Timeout.to_string(), "Request timeout. Please try again.");
        let net = TransportError::Network { detail: "connection refused".into() };
        assert!(net.to_string().starts_with("Network error."));
    }

    #[test]
    fn test_api_error_prefixes_operation() {
        let err = ApiError::new(Endpoint::OilPrices, TransportError::NotFound);
        assert_eq!(
            err.to_string(),
            "Failed to fetch oil prices: Data not found. Please ensure the analysis has been completed."
        );
        let err = ApiError::new(Endpoint::Health, TransportError::Timeout);
        assert_eq!(err.to_string(), "Health check failed: Request timeout. Please try again.");
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }
}
