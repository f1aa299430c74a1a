//! HTTP handlers: parse and validate the request, call a service, shape the response.

pub mod courses;
pub mod students;
