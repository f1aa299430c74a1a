//! Course operations and the per-course enrollment view.

use crate::error::AppError;
use crate::model::{Course, CoursePayload, CourseStudentCount};
use crate::pagination::{Page, PageRequest};
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct CourseService {
    store: Arc<dyn Store>,
}

impl CourseService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        CourseService { store }
    }

    pub async fn find_all(&self) -> Result<Vec<Course>, AppError> {
        self.store.courses().await
    }

    pub async fn find_page(&self, req: &PageRequest) -> Result<Page<Course>, AppError> {
        self.store.courses_page(req).await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Course, AppError> {
        self.store
            .course(id)
            .await?
            .ok_or_else(|| AppError::course_not_found(id))
    }

    pub async fn create(&self, body: CoursePayload) -> Result<i64, AppError> {
        let id = self.store.insert_course(&body.into_new_course()).await?;
        tracing::info!(course_id = id, "course created");
        Ok(id)
    }

    /// Remove a course and its enrollments. Enrolled students are kept.
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !self.store.delete_course(id).await? {
            return Err(AppError::course_not_found(id));
        }
        tracing::info!(course_id = id, "course deleted");
        Ok(())
    }

    /// Recomputed on every call.
    pub async fn student_counts(&self) -> Result<Vec<CourseStudentCount>, AppError> {
        self.store.student_counts().await
    }
}
