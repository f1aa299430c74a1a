use super::Store;
use crate::error::AppError;
use crate::model::{Course, CourseStudentCount, Member, NewCourse, NewStudent, Student};
use crate::pagination::{Page, PageRequest};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

#[derive(Clone, Debug)]
struct StudentRow {
    name: String,
    email: Option<String>,
}

#[derive(Clone, Debug)]
struct CourseRow {
    name: String,
    instructor: Option<String>,
}

#[derive(Debug, Default)]
struct Tables {
    students: BTreeMap<i64, StudentRow>,
    courses: BTreeMap<i64, CourseRow>,
    /// (student_id, course_id)
    enrollments: BTreeSet<(i64, i64)>,
    last_student_id: i64,
    last_course_id: i64,
}

impl Tables {
    fn student(&self, id: i64) -> Option<Student> {
        let row = self.students.get(&id)?;
        let courses = self
            .enrollments
            .iter()
            .filter(|(s, _)| *s == id)
            .filter_map(|(_, c)| {
                self.courses.get(c).map(|course| Member {
                    id: *c,
                    name: course.name.clone(),
                })
            })
            .collect();
        Some(Student {
            id,
            name: row.name.clone(),
            email: row.email.clone(),
            courses,
        })
    }

    fn course(&self, id: i64) -> Option<Course> {
        let row = self.courses.get(&id)?;
        let mut students: Vec<Member> = self
            .enrollments
            .iter()
            .filter(|(_, c)| *c == id)
            .filter_map(|(s, _)| {
                self.students.get(s).map(|student| Member {
                    id: *s,
                    name: student.name.clone(),
                })
            })
            .collect();
        students.sort_by_key(|m| m.id);
        Some(Course {
            id,
            name: row.name.clone(),
            instructor: row.instructor.clone(),
            students,
        })
    }

    fn all_students(&self) -> Vec<Student> {
        self.students.keys().filter_map(|id| self.student(*id)).collect()
    }

    fn all_courses(&self) -> Vec<Course> {
        self.courses.keys().filter_map(|id| self.course(*id)).collect()
    }

    fn check_courses(&self, ids: &[i64]) -> Result<(), AppError> {
        match ids.iter().find(|id| !self.courses.contains_key(id)) {
            Some(id) => Err(AppError::course_not_found(*id)),
            None => Ok(()),
        }
    }

    fn set_enrollments(&mut self, student_id: i64, course_ids: &[i64]) {
        self.enrollments.retain(|(s, _)| *s != student_id);
        self.enrollments.extend(course_ids.iter().map(|c| (student_id, *c)));
    }
}

/// In-process store for tests and database-less runs. Ids start at 1 and are never reused.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn students(&self) -> Result<Vec<Student>, AppError> {
        Ok(self.tables.read().await.all_students())
    }

    async fn students_page(&self, req: &PageRequest) -> Result<Page<Student>, AppError> {
        Ok(req.window(self.tables.read().await.all_students()))
    }

    async fn student(&self, id: i64) -> Result<Option<Student>, AppError> {
        Ok(self.tables.read().await.student(id))
    }

    async fn students_name_containing(&self, fragment: &str) -> Result<Vec<Student>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .students
            .iter()
            .filter(|(_, row)| row.name.contains(fragment))
            .filter_map(|(id, _)| tables.student(*id))
            .collect())
    }

    async fn insert_student(&self, student: &NewStudent) -> Result<i64, AppError> {
        let mut tables = self.tables.write().await;
        tables.check_courses(&student.course_ids)?;
        tables.last_student_id += 1;
        let id = tables.last_student_id;
        tables.students.insert(
            id,
            StudentRow {
                name: student.name.clone(),
                email: student.email.clone(),
            },
        );
        tables.set_enrollments(id, &student.course_ids);
        Ok(id)
    }

    async fn update_student(&self, student: &Student, course_ids: Option<&[i64]>) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.students.contains_key(&student.id) {
            return Ok(false);
        }
        if let Some(ids) = course_ids {
            tables.check_courses(ids)?;
            tables.set_enrollments(student.id, ids);
        }
        tables.students.insert(
            student.id,
            StudentRow {
                name: student.name.clone(),
                email: student.email.clone(),
            },
        );
        Ok(true)
    }

    async fn delete_student(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.students.remove(&id).is_none() {
            return Ok(false);
        }
        tables.enrollments.retain(|(s, _)| *s != id);
        Ok(true)
    }

    async fn courses(&self) -> Result<Vec<Course>, AppError> {
        Ok(self.tables.read().await.all_courses())
    }

    async fn courses_page(&self, req: &PageRequest) -> Result<Page<Course>, AppError> {
        Ok(req.window(self.tables.read().await.all_courses()))
    }

    async fn course(&self, id: i64) -> Result<Option<Course>, AppError> {
        Ok(self.tables.read().await.course(id))
    }

    async fn insert_course(&self, course: &NewCourse) -> Result<i64, AppError> {
        let mut tables = self.tables.write().await;
        tables.last_course_id += 1;
        let id = tables.last_course_id;
        tables.courses.insert(
            id,
            CourseRow {
                name: course.name.clone(),
                instructor: course.instructor.clone(),
            },
        );
        Ok(id)
    }

    async fn delete_course(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.courses.remove(&id).is_none() {
            return Ok(false);
        }
        tables.enrollments.retain(|(_, c)| *c != id);
        Ok(true)
    }

    async fn missing_course_ids(&self, ids: &[i64]) -> Result<Vec<i64>, AppError> {
        let tables = self.tables.read().await;
        Ok(ids.iter().copied().filter(|id| !tables.courses.contains_key(id)).collect())
    }

    async fn student_counts(&self) -> Result<Vec<CourseStudentCount>, AppError> {
        let tables = self.tables.read().await;
        let mut counts: BTreeMap<i64, i64> = BTreeMap::new();
        for (_, course_id) in &tables.enrollments {
            *counts.entry(*course_id).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .filter_map(|(course_id, student_count)| {
                tables.courses.get(&course_id).map(|c| CourseStudentCount {
                    course_id,
                    course_name: c.name.clone(),
                    student_count,
                })
            })
            .collect())
    }
}
