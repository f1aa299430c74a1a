//! Typed errors and HTTP mapping.

use axum::{
    extract::{OriginalUri, Request},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
    #[error("unknown store backend: {0}")]
    UnknownBackend(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
}

impl AppError {
    pub fn student_not_found(id: i64) -> Self {
        AppError::NotFound(format!("student {}", id))
    }

    pub fn course_not_found(id: i64) -> Self {
        AppError::NotFound(format!("course {}", id))
    }

    /// Status and stable machine code for this error.
    pub fn status_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::Db(e) => match e {
                sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "not_found"),
                sqlx::Error::Database(db) if db.is_unique_violation() => (StatusCode::CONFLICT, "conflict"),
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    (StatusCode::NOT_FOUND, "related_not_found")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            },
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Clone, Debug, Serialize)]
pub struct ErrorDetail {
    pub status: u16,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub timestamp: String,
}

impl ErrorDetail {
    fn new(status: StatusCode, code: &str, message: String) -> Self {
        ErrorDetail {
            status: status.as_u16(),
            code: code.to_string(),
            message,
            path: None,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Detail for a failure produced outside our handlers (axum method routing, body limit layer).
    fn from_status(status: StatusCode) -> Self {
        let code = match status {
            StatusCode::BAD_REQUEST => "bad_request",
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::METHOD_NOT_ALLOWED => "method_not_allowed",
            StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
            StatusCode::UNSUPPORTED_MEDIA_TYPE => "unsupported_media_type",
            s if s.is_server_error() => "internal_error",
            _ => "request_error",
        };
        let message = status.canonical_reason().unwrap_or("request failed").to_ascii_lowercase();
        ErrorDetail::new(status, code, message)
    }

    fn render(self, status: StatusCode) -> Response {
        let mut res = (status, Json(ErrorBody { error: self.clone() })).into_response();
        res.extensions_mut().insert(self);
        res
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            tracing::debug!(error = %self, "request rejected");
            self.to_string()
        };
        ErrorDetail::new(status, code, message).render(status)
    }
}

fn has_json_body(res: &Response) -> bool {
    res.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

/// Middleware: re-renders error bodies with the path of the originating request.
/// Error responses built by axum or tower-http (405, 413, ...) get the same body shape;
/// JSON error bodies written deliberately by a route are left alone.
pub async fn attach_request_path(req: Request, next: Next) -> Response {
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let res = next.run(req).await;
    let status = res.status();
    let detail = match res.extensions().get::<ErrorDetail>().cloned() {
        Some(detail) => detail,
        None if (status.is_client_error() || status.is_server_error()) && !has_json_body(&res) => {
            tracing::debug!(status = status.as_u16(), path = %path, "framework error response");
            ErrorDetail::from_status(status)
        }
        None => return res,
    };
    let (mut parts, _) = res.into_parts();
    let mut rendered = ErrorDetail {
        path: Some(path),
        ..detail
    }
    .render(status);
    if let Some(allow) = parts.headers.remove(header::ALLOW) {
        rendered.headers_mut().insert(header::ALLOW, allow);
    }
    rendered
}

/// Fallback for unmatched routes.
pub async fn route_not_found() -> AppError {
    AppError::NotFound("no route for request".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let (status, code) = AppError::student_not_found(7).status_code();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "not_found");
    }

    #[test]
    fn malformed_requests_map_to_400() {
        assert_eq!(AppError::BadRequest("x".into()).status_code().0, StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Validation("x".into()).status_code().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unexpected_faults_hide_detail() {
        let err = AppError::Config(ConfigError::UnknownBackend("redis://secret@host".into()));
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = res.extensions().get::<ErrorDetail>().unwrap();
        assert_eq!(detail.message, "internal server error");
    }

    #[test]
    fn oversized_bodies_map_to_413() {
        let (status, code) = AppError::PayloadTooLarge("length limit exceeded".into()).status_code();
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(code, "payload_too_large");
    }

    #[test]
    fn framework_statuses_get_stable_codes() {
        let detail = ErrorDetail::from_status(StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(detail.status, 405);
        assert_eq!(detail.code, "method_not_allowed");
        assert_eq!(detail.message, "method not allowed");
        assert_eq!(ErrorDetail::from_status(StatusCode::PAYLOAD_TOO_LARGE).code, "payload_too_large");
        assert_eq!(ErrorDetail::from_status(StatusCode::BAD_GATEWAY).code, "internal_error");
    }
}
