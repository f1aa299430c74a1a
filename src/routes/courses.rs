use crate::handlers::courses::{create, delete, list, page, read, student_counts};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn course_routes(state: AppState) -> Router {
    Router::new()
        .route("/courses", get(list).post(create))
        .route("/courses/paging", get(page))
        .route("/courses/:id", get(read).delete(delete))
        .route("/studcount", get(student_counts))
        .with_state(state)
}
