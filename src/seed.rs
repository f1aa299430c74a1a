//! Demo catalogue for fresh installs (`SEED_DEMO_DATA=true`).

use crate::error::AppError;
use crate::model::{NewCourse, NewStudent};
use crate::store::Store;

const COURSES: &[(&str, &str)] = &[
    ("Data Science", "Sally"),
    ("JavaScript", "Sally"),
    ("Node.js", "Sally"),
    ("Java Back End", "Lucy"),
    ("Mobile IOS", "Charlie"),
    ("Mobile Android", "Charlie"),
];

/// (name, email, indexes into COURSES)
const STUDENTS: &[(&str, &str, &[usize])] = &[
    ("John", "john@school.local", &[0, 3]),
    ("Julian", "julian@school.local", &[0]),
    ("Mary", "mary@school.local", &[1, 2, 3]),
];

/// Insert the demo data when no course exists yet. Returns whether anything was inserted.
pub async fn seed_demo_data(store: &dyn Store) -> Result<bool, AppError> {
    if !store.courses().await?.is_empty() {
        tracing::info!("storage already has courses; skipping demo data");
        return Ok(false);
    }
    let mut course_ids = Vec::with_capacity(COURSES.len());
    for (name, instructor) in COURSES {
        let id = store
            .insert_course(&NewCourse {
                name: name.to_string(),
                instructor: Some(instructor.to_string()),
            })
            .await?;
        course_ids.push(id);
    }
    for (name, email, enrolled) in STUDENTS {
        store
            .insert_student(&NewStudent {
                name: name.to_string(),
                email: Some(email.to_string()),
                course_ids: enrolled.iter().map(|i| course_ids[*i]).collect(),
            })
            .await?;
    }
    tracing::info!(courses = COURSES.len(), students = STUDENTS.len(), "demo data inserted");
    Ok(true)
}
