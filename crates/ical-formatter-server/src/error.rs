//! Request failures and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ical_formatter::FormatError;
use thiserror::Error;

use crate::fetch::FetchError;

/// Message sent instead of transform details when verbose errors are off.
const GENERIC_TRANSFORM_ERROR: &str = "calendar transformation failed";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unknown profile: '{0}'")]
    UnknownProfile(String),

    #[error("Profile '{0}' has no source URL; pass one with ?url=")]
    MissingSource(String),

    /// The profile exists but its configuration (e.g. extension file) is broken.
    #[error("Profile configuration error: {0}")]
    Config(#[source] FormatError),

    #[error("Failed to fetch source: {0}")]
    Fetch(#[from] FetchError),

    #[error("Upstream calendar is malformed: {0}")]
    Parse(#[source] FormatError),

    #[error("Transform failed: {source}")]
    Transform {
        #[source]
        source: FormatError,
        /// Send `source` to the client instead of a generic message.
        detailed: bool,
    },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UnknownProfile(_) => StatusCode::NOT_FOUND,
            AppError::MissingSource(_) => StatusCode::BAD_REQUEST,
            AppError::Fetch(_) | AppError::Parse(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) | AppError::Transform { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        let message = match &self {
            AppError::Transform { detailed: false, .. } => GENERIC_TRANSFORM_ERROR.to_string(),
            other => other.to_string(),
        };
        (status, message).into_response()
    }
}
