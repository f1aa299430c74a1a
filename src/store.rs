//! Storage seam: the services talk to `dyn Store`; backends are PostgreSQL and in-memory.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

use crate::error::AppError;
use crate::model::{Course, CourseStudentCount, NewCourse, NewStudent, Student};
use crate::pagination::{Page, PageRequest};
use async_trait::async_trait;

/// Persistence for students, courses and the enrollment links between them.
///
/// Writes are all-or-nothing per call. Callers validate related ids first; a backend
/// may still reject a dangling course id with `AppError::NotFound`.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap liveness probe for readiness checks.
    async fn ping(&self) -> Result<(), AppError>;

    async fn students(&self) -> Result<Vec<Student>, AppError>;
    async fn students_page(&self, req: &PageRequest) -> Result<Page<Student>, AppError>;
    async fn student(&self, id: i64) -> Result<Option<Student>, AppError>;
    /// Case-sensitive substring match on name, in id order. Empty fragment matches all.
    async fn students_name_containing(&self, fragment: &str) -> Result<Vec<Student>, AppError>;
    async fn insert_student(&self, student: &NewStudent) -> Result<i64, AppError>;
    /// Overwrite name/email and, when `course_ids` is given, the enrollment set.
    /// Returns false when no student has `student.id`.
    async fn update_student(&self, student: &Student, course_ids: Option<&[i64]>) -> Result<bool, AppError>;
    /// Remove the student and its enrollment links. Returns false when absent.
    async fn delete_student(&self, id: i64) -> Result<bool, AppError>;

    async fn courses(&self) -> Result<Vec<Course>, AppError>;
    async fn courses_page(&self, req: &PageRequest) -> Result<Page<Course>, AppError>;
    async fn course(&self, id: i64) -> Result<Option<Course>, AppError>;
    async fn insert_course(&self, course: &NewCourse) -> Result<i64, AppError>;
    /// Remove the course and its enrollment links; students survive. Returns false when absent.
    async fn delete_course(&self, id: i64) -> Result<bool, AppError>;
    /// Ids from `ids` with no matching course.
    async fn missing_course_ids(&self, ids: &[i64]) -> Result<Vec<i64>, AppError>;
    /// Enrolled-student count per course that has at least one enrollment, by course id.
    async fn student_counts(&self) -> Result<Vec<CourseStudentCount>, AppError>;
}
