//! Request validation run by handlers before a payload reaches a service.

use crate::error::AppError;
use crate::model::{CoursePayload, IdRef, StudentPayload};
use regex::Regex;
use std::sync::OnceLock;

pub const NAME_MAX_LENGTH: usize = 255;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles"))
}

pub struct RequestValidator;

impl RequestValidator {
    /// Full payload for create: name is required.
    pub fn validate_student(body: &StudentPayload) -> Result<(), AppError> {
        match body.name.as_deref() {
            Some(name) if !name.trim().is_empty() => validate_name("name", name)?,
            _ => return Err(AppError::Validation("name is required".into())),
        }
        validate_student_optionals(body)
    }

    /// Only the fields present in body (for PUT). Blank name means "leave unchanged".
    pub fn validate_student_partial(body: &StudentPayload) -> Result<(), AppError> {
        if let Some(name) = body.name.as_deref().filter(|n| !n.is_empty()) {
            validate_name("name", name)?;
        }
        validate_student_optionals(body)
    }

    pub fn validate_course(body: &CoursePayload) -> Result<(), AppError> {
        match body.name.as_deref() {
            Some(name) if !name.trim().is_empty() => validate_name("name", name)?,
            _ => return Err(AppError::Validation("name is required".into())),
        }
        if let Some(instructor) = body.instructor.as_deref().filter(|i| !i.is_empty()) {
            validate_name("instructor", instructor)?;
        }
        Ok(())
    }
}

fn validate_student_optionals(body: &StudentPayload) -> Result<(), AppError> {
    if let Some(email) = body.email.as_deref().filter(|e| !e.is_empty()) {
        if email.len() > NAME_MAX_LENGTH || !email_pattern().is_match(email) {
            return Err(AppError::Validation("email must be a valid email".into()));
        }
    }
    if let Some(courses) = &body.courses {
        validate_refs("courses", courses)?;
    }
    Ok(())
}

fn validate_name(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} must not be blank", field)));
    }
    if value.chars().count() > NAME_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, NAME_MAX_LENGTH
        )));
    }
    Ok(())
}

fn validate_refs(field: &str, refs: &[IdRef]) -> Result<(), AppError> {
    match refs.iter().find(|r| r.id <= 0) {
        Some(r) => Err(AppError::Validation(format!("{} contains invalid id {}", field, r.id))),
        None => Ok(()),
    }
}
