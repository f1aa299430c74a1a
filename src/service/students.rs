//! Student operations on top of a `Store`.

use crate::error::AppError;
use crate::model::{Student, StudentPayload};
use crate::pagination::{Page, PageRequest};
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct StudentService {
    store: Arc<dyn Store>,
}

impl StudentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        StudentService { store }
    }

    pub async fn find_all(&self) -> Result<Vec<Student>, AppError> {
        self.store.students().await
    }

    pub async fn find_page(&self, req: &PageRequest) -> Result<Page<Student>, AppError> {
        self.store.students_page(req).await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Student, AppError> {
        self.store
            .student(id)
            .await?
            .ok_or_else(|| AppError::student_not_found(id))
    }

    pub async fn find_by_name_containing(&self, fragment: &str) -> Result<Vec<Student>, AppError> {
        self.store.students_name_containing(fragment).await
    }

    /// Insert a validated payload. Every referenced course must exist. Returns the new id.
    pub async fn create(&self, body: StudentPayload) -> Result<i64, AppError> {
        let new_student = body.into_new_student();
        self.ensure_courses_exist(&new_student.course_ids).await?;
        let id = self.store.insert_student(&new_student).await?;
        tracing::info!(student_id = id, courses = new_student.course_ids.len(), "student created");
        Ok(id)
    }

    /// Partial merge: only non-empty fields in `body` overwrite the stored student.
    pub async fn update(&self, id: i64, body: StudentPayload) -> Result<(), AppError> {
        let mut student = self.find_by_id(id).await?;
        let course_ids = body.merge_into(&mut student);
        if let Some(ids) = &course_ids {
            self.ensure_courses_exist(ids).await?;
        }
        if !self.store.update_student(&student, course_ids.as_deref()).await? {
            return Err(AppError::student_not_found(id));
        }
        tracing::info!(student_id = id, "student updated");
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !self.store.delete_student(id).await? {
            return Err(AppError::student_not_found(id));
        }
        tracing::info!(student_id = id, "student deleted");
        Ok(())
    }

    async fn ensure_courses_exist(&self, ids: &[i64]) -> Result<(), AppError> {
        let missing = self.store.missing_course_ids(ids).await?;
        match missing.first() {
            Some(id) => {
                tracing::debug!(missing = ?missing, "rejecting dangling course references");
                Err(AppError::course_not_found(*id))
            }
            None => Ok(()),
        }
    }
}
