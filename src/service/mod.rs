//! Resource services: existence checks, partial-update merge, and store calls.

mod courses;
mod students;
mod validation;
pub use courses::CourseService;
pub use students::StudentService;
pub use validation::{RequestValidator, NAME_MAX_LENGTH};
