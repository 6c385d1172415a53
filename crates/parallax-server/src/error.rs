//! Server error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parallax_proto::ProtocolError;
use thiserror::Error;

/// Errors surfaced by the dispatch server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The request envelope failed to decode. Aborts the whole request
    /// before dispatch begins.
    #[error("decode error: {0}")]
    Decode(#[from] ProtocolError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Stable machine-readable error discriminant.
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode_error",
            Self::Config(_) => "config_error",
            Self::Io(_) => "io_error",
        }
    }

    /// HTTP status code for this error.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Decode failures are the client's fault and safe to describe;
        // everything else stays opaque.
        let message = match &self {
            Self::Decode(e) => format!("Malformed packet: {e}"),
            Self::Config(_) | Self::Io(_) => "Internal server error".to_owned(),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        assert_eq!(
            ServerError::Decode(ProtocolError::UnsupportedVersion(9)).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::Config("bad".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_types() {
        assert_eq!(
            ServerError::Decode(ProtocolError::UnsupportedVersion(9)).error_type(),
            "decode_error"
        );
        assert_eq!(ServerError::Config("bad".into()).error_type(), "config_error");
    }
}
