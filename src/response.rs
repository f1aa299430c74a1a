//! Response helpers for writes, which answer with headers and status only.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// 201 with `Location: {collection_path}/{id}` and an empty body.
pub fn created_at(collection_path: &str, id: i64) -> Response {
    let location = format!("{}/{}", collection_path.trim_end_matches('/'), id);
    match HeaderValue::from_str(&location) {
        Ok(value) => (StatusCode::CREATED, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::CREATED.into_response(),
    }
}

/// 200 with an empty body, for update and delete.
pub fn ok_empty() -> Response {
    StatusCode::OK.into_response()
}
