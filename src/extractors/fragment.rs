//! Free-text path segment, percent-decoded.

use crate::error::AppError;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

/// The single path parameter as text. Segments that do not decode to UTF-8 are a 400.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for Fragment
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<String>::from_request_parts(parts, state)
            .await
            .map(|Path(raw)| Fragment(raw))
            .map_err(|e| AppError::BadRequest(e.body_text()))
    }
}
