//! Router assembly: resource routes, common routes, fallback, and the layer stack.

mod common;
mod courses;
mod students;
pub use common::common_routes;
pub use courses::course_routes;
pub use students::student_routes;

use crate::error::{attach_request_path, route_not_found};
use crate::state::AppState;
use axum::{middleware, Router};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Every route of the service. Errors from any route (including unmatched paths, wrong methods
/// and oversized bodies) carry the request path.
pub fn app_routes(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(course_routes(state.clone()))
        .merge(student_routes(state))
        .fallback(route_not_found)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(middleware::from_fn(attach_request_path))
        .layer(TraceLayer::new_for_http())
}
