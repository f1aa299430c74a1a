//! Shared application state for all routes, built once at startup.

use crate::config::PagingConfig;
use crate::service::{CourseService, StudentService};
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub students: StudentService,
    pub courses: CourseService,
    pub paging: PagingConfig,
}

impl AppState {
    /// Wire both services onto the same store.
    pub fn new(store: Arc<dyn Store>, paging: PagingConfig) -> Self {
        AppState {
            students: StudentService::new(store.clone()),
            courses: CourseService::new(store.clone()),
            store,
            paging,
        }
    }
}
