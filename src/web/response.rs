//! JSON or HTML, chosen by the `Accept` header.

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use serde_json::{json, Value};
use tracing::error;

use super::pages::escape_html;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Html,
}

impl Format {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let wants_json = headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains("application/json"));
        if wants_json {
            Format::Json
        } else {
            Format::Html
        }
    }

    /// Render a successful result.
    pub fn ok(self, body: Value, fragment: String) -> Response {
        match self {
            Format::Json => Json(body).into_response(),
            Format::Html => Html(fragment).into_response(),
        }
    }
}

/// Any failure inside a handler. Rendered as `{"error": ...}` with status 500.
#[derive(Debug)]
pub struct ApiError {
    error: Error,
    format: Format,
}

impl ApiError {
    pub fn new(error: Error, format: Format) -> Self {
        Self { error, format }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.error, "Request failed");
        let message = self.error.to_string();
        let body = match self.format {
            Format::Json => Json(json!({ "error": message })).into_response(),
            Format::Html => Html(format!(
                "<p class=\"error\">{}</p>",
                escape_html(&message)
            ))
            .into_response(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Attach the response format to library errors.
pub trait WithFormat<T> {
    fn in_format(self, format: Format) -> Result<T, ApiError>;
}

impl<T> WithFormat<T> for crate::Result<T> {
    fn in_format(self, format: Format) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::new(e, format))
    }
}
