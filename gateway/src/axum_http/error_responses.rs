use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use crates::domain::repositories::file_host::FileHostError;
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, error, warn};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    BadRequest(String),

    #[error("missing or invalid gateway token")]
    Unauthorized,

    #[error("only local callers may use this gateway")]
    Forbidden,

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    NotFound(String),

    #[error("request did not finish within {0}s")]
    DeadlineExceeded(u64),

    #[error(transparent)]
    Upstream(#[from] FileHostError),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden => StatusCode::FORBIDDEN,
            GatewayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Upstream(err) => match err {
                FileHostError::NotFound(_) => StatusCode::NOT_FOUND,
                FileHostError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                FileHostError::Rejected { .. }
                | FileHostError::Network(_)
                | FileHostError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }

    /// Upstream failures are logged by the use case with the file they
    /// concern, so they are not logged again here.
    pub fn log_level(&self) -> Option<Level> {
        match self {
            GatewayError::Upstream(_) => None,
            _ if self.status_code().is_server_error() => Some(Level::ERROR),
            _ => Some(Level::WARN),
        }
    }

    pub fn report(&self) {
        let status = self.status_code().as_u16();
        match self.log_level() {
            Some(level) if level == Level::ERROR => {
                error!(status, error = %self, "gateway: request failed")
            }
            Some(_) => warn!(status, error = %self, "gateway: request rejected"),
            None => {}
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.report();

        (self.status_code(), Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_errors_map_to_gateway_statuses() {
        assert_eq!(
            GatewayError::from(FileHostError::Timeout).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            GatewayError::from(FileHostError::NotFound("x".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::from(FileHostError::Rejected {
                status: 413,
                code: None,
                message: "too big".into(),
            })
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn upstream_failures_are_not_logged_twice() {
        assert_eq!(
            GatewayError::from(FileHostError::Timeout).log_level(),
            None
        );
        assert_eq!(GatewayError::DeadlineExceeded(900).log_level(), Some(Level::ERROR));
        assert_eq!(GatewayError::Forbidden.log_level(), Some(Level::WARN));
    }

    #[test]
    fn deadline_maps_to_gateway_timeout() {
        let err = GatewayError::DeadlineExceeded(900);

        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(err.to_string(), "request did not finish within 900s");
    }

    #[test]
    fn upstream_message_is_passed_through() {
        let err = GatewayError::from(FileHostError::Network("connection refused".into()));

        assert_eq!(err.to_string(), "could not reach file host: connection refused");
    }
}
