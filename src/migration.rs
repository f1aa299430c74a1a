//! Schema for the PostgreSQL store. Idempotent: safe to run on every startup.

use crate::error::AppError;
use sqlx::PgPool;

/// Statements in dependency order: enrollment links reference both entity tables and
/// cascade on delete from either side, so removing an entity never removes the other.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS "course" (
        "id" BIGSERIAL PRIMARY KEY,
        "name" TEXT NOT NULL,
        "instructor" TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS "student" (
        "id" BIGSERIAL PRIMARY KEY,
        "name" TEXT NOT NULL,
        "email" TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS "studcourses" (
        "student_id" BIGINT NOT NULL REFERENCES "student" ("id") ON DELETE CASCADE,
        "course_id" BIGINT NOT NULL REFERENCES "course" ("id") ON DELETE CASCADE,
        PRIMARY KEY ("student_id", "course_id")
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS "studcourses_course_id_idx" ON "studcourses" ("course_id")"#,
];

/// Create tables and indexes that do not exist yet.
pub async fn apply_migrations(pool: &PgPool) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    for ddl in SCHEMA {
        tracing::debug!(sql = %ddl.trim(), "migration");
        sqlx::query(ddl).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::info!(statements = SCHEMA.len(), "schema up to date");
    Ok(())
}
