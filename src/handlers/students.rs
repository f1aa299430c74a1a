//! Student handlers: list, page, read, name search, create, partial update, delete.

use crate::error::AppError;
use crate::extractors::{EntityId, Fragment, QueryPairs, ValidJson};
use crate::model::{Student, StudentPayload};
use crate::pagination::{Page, PageRequest, Sortable};
use crate::response::{created_at, ok_empty};
use crate::service::RequestValidator;
use crate::state::AppState;
use axum::{
    extract::{OriginalUri, State},
    response::Response,
    Json,
};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Student>>, AppError> {
    Ok(Json(state.students.find_all().await?))
}

pub async fn page(
    State(state): State<AppState>,
    QueryPairs(params): QueryPairs,
) -> Result<Json<Page<Student>>, AppError> {
    let req = PageRequest::from_query(&params, Student::SORT_FIELDS, &state.paging)?;
    Ok(Json(state.students.find_page(&req).await?))
}

pub async fn read(State(state): State<AppState>, EntityId(id): EntityId) -> Result<Json<Student>, AppError> {
    Ok(Json(state.students.find_by_id(id).await?))
}

pub async fn name_like(
    State(state): State<AppState>,
    Fragment(fragment): Fragment,
) -> Result<Json<Vec<Student>>, AppError> {
    Ok(Json(state.students.find_by_name_containing(&fragment).await?))
}

/// `/student/namelike/` with nothing after the slash: the empty fragment matches everyone.
pub async fn name_like_empty(State(state): State<AppState>) -> Result<Json<Vec<Student>>, AppError> {
    Ok(Json(state.students.find_by_name_containing("").await?))
}

pub async fn create(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ValidJson(body): ValidJson<StudentPayload>,
) -> Result<Response, AppError> {
    RequestValidator::validate_student(&body)?;
    let id = state.students.create(body).await?;
    Ok(created_at(uri.path(), id))
}

pub async fn update(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    ValidJson(body): ValidJson<StudentPayload>,
) -> Result<Response, AppError> {
    RequestValidator::validate_student_partial(&body)?;
    state.students.update(id, body).await?;
    Ok(ok_empty())
}

pub async fn delete(State(state): State<AppState>, EntityId(id): EntityId) -> Result<Response, AppError> {
    state.students.delete(id).await?;
    Ok(ok_empty())
}
