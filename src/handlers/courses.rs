//! Course handlers plus the `/studcount` view.

use crate::error::AppError;
use crate::extractors::{EntityId, QueryPairs, ValidJson};
use crate::model::{Course, CoursePayload, CourseStudentCount};
use crate::pagination::{Page, PageRequest, Sortable};
use crate::response::{created_at, ok_empty};
use crate::service::RequestValidator;
use crate::state::AppState;
use axum::{
    extract::{OriginalUri, State},
    response::Response,
    Json,
};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    Ok(Json(state.courses.find_all().await?))
}

pub async fn page(
    State(state): State<AppState>,
    QueryPairs(params): QueryPairs,
) -> Result<Json<Page<Course>>, AppError> {
    let req = PageRequest::from_query(&params, Course::SORT_FIELDS, &state.paging)?;
    Ok(Json(state.courses.find_page(&req).await?))
}

pub async fn read(State(state): State<AppState>, EntityId(id): EntityId) -> Result<Json<Course>, AppError> {
    Ok(Json(state.courses.find_by_id(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ValidJson(body): ValidJson<CoursePayload>,
) -> Result<Response, AppError> {
    RequestValidator::validate_course(&body)?;
    let id = state.courses.create(body).await?;
    Ok(created_at(uri.path(), id))
}

pub async fn delete(State(state): State<AppState>, EntityId(id): EntityId) -> Result<Response, AppError> {
    state.courses.delete(id).await?;
    Ok(ok_empty())
}

pub async fn student_counts(State(state): State<AppState>) -> Result<Json<Vec<CourseStudentCount>>, AppError> {
    Ok(Json(state.courses.student_counts().await?))
}
