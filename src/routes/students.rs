use crate::handlers::students::{create, delete, list, name_like, name_like_empty, page, read, update};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

/// `/students` collection views and `/student` single-resource operations.
pub fn student_routes(state: AppState) -> Router {
    Router::new()
        .route("/students", get(list))
        .route("/students/paging", get(page))
        .route("/student", post(create))
        .route("/student/:id", get(read).put(update).delete(delete))
        .route("/student/namelike", get(name_like_empty))
        .route("/student/namelike/", get(name_like_empty))
        .route("/student/namelike/:fragment", get(name_like))
        .with_state(state)
}
