//! Resource shapes exposed over HTTP and exchanged with the store.

use crate::pagination::Sortable;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Id and name of a related resource, as embedded in the other side of an enrollment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Enrolled courses, ordered by course id.
    #[serde(default)]
    pub courses: Vec<Member>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
    /// Enrolled students, ordered by student id.
    #[serde(default)]
    pub students: Vec<Member>,
}

/// Reference to an existing resource inside a payload. Other keys are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRef {
    pub id: i64,
}

/// Body of `POST /student` and `PUT /student/{id}`. Every field is optional so the same
/// shape carries both a full create and a partial update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub courses: Option<Vec<IdRef>>,
}

/// Validated student ready to be inserted; storage assigns the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewStudent {
    pub name: String,
    pub email: Option<String>,
    pub course_ids: Vec<i64>,
}

/// Body of `POST /courses`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoursePayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCourse {
    pub name: String,
    pub instructor: Option<String>,
}

/// One row of the `/studcount` view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseStudentCount {
    pub course_id: i64,
    pub course_name: String,
    pub student_count: i64,
}

impl Student {
    pub fn course_ids(&self) -> Vec<i64> {
        self.courses.iter().map(|c| c.id).collect()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl StudentPayload {
    /// Merge onto a stored student: only non-empty supplied fields overwrite.
    /// Returns the replacement course ids when the enrollment set changes.
    pub fn merge_into(self, student: &mut Student) -> Option<Vec<i64>> {
        if let Some(name) = non_empty(self.name) {
            student.name = name;
        }
        if let Some(email) = non_empty(self.email) {
            student.email = Some(email);
        }
        match self.courses {
            Some(refs) if !refs.is_empty() => Some(dedup_ids(refs.iter().map(|r| r.id))),
            _ => None,
        }
    }

    /// Convert a validated create payload.
    pub fn into_new_student(self) -> NewStudent {
        NewStudent {
            name: self.name.unwrap_or_default(),
            email: non_empty(self.email),
            course_ids: dedup_ids(self.courses.unwrap_or_default().iter().map(|r| r.id)),
        }
    }
}

impl CoursePayload {
    pub fn into_new_course(self) -> NewCourse {
        NewCourse {
            name: self.name.unwrap_or_default(),
            instructor: non_empty(self.instructor),
        }
    }
}

/// Sorted, duplicate-free id list.
pub fn dedup_ids(ids: impl Iterator<Item = i64>) -> Vec<i64> {
    let mut out: Vec<i64> = ids.collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Missing values sort after present ones (ascending).
fn cmp_optional(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.as_bytes().cmp(y.as_bytes()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Sortable for Student {
    const SORT_FIELDS: &'static [&'static str] = &["id", "name", "email"];

    fn compare_field(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "name" => self.name.as_bytes().cmp(other.name.as_bytes()),
            "email" => cmp_optional(&self.email, &other.email),
            _ => self.id.cmp(&other.id),
        }
    }
}

impl Sortable for Course {
    const SORT_FIELDS: &'static [&'static str] = &["id", "name", "instructor"];

    fn compare_field(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "name" => self.name.as_bytes().cmp(other.name.as_bytes()),
            "instructor" => cmp_optional(&self.instructor, &other.instructor),
            _ => self.id.cmp(&other.id),
        }
    }
}
