//! School records: student and course REST backend with PostgreSQL or in-memory storage.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod model;
pub mod pagination;
pub mod response;
pub mod routes;
pub mod seed;
pub mod service;
pub mod state;
pub mod store;

pub use config::{AppConfig, PagingConfig, StoreBackend};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use model::{Course, CourseStudentCount, Student};
pub use pagination::{Page, PageRequest};
pub use routes::app_routes;
pub use seed::seed_demo_data;
pub use service::{CourseService, StudentService};
pub use state::AppState;
pub use store::{ensure_database_exists, MemoryStore, PgStore, Store};
