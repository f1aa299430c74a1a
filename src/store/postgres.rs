use super::Store;
use crate::config::AppConfig;
use crate::error::{AppError, ConfigError};
use crate::model::{Course, CourseStudentCount, Member, NewCourse, NewStudent, Student};
use crate::pagination::{Page, PageRequest, SortKey};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgConnection, PgPool};
use std::collections::HashMap;
use std::str::FromStr;

const STUDENT_COLUMNS: &str = "\"id\", \"name\", \"email\"";
const COURSE_COLUMNS: &str = "\"id\", \"name\", \"instructor\"";
/// Text columns get byte-wise ordering so results do not depend on the database locale.
const TEXT_SORT_FIELDS: &[&str] = &["name", "email", "instructor"];

#[derive(sqlx::FromRow)]
struct StudentRow {
    id: i64,
    name: String,
    email: Option<String>,
}

#[derive(sqlx::FromRow)]
struct CourseRow {
    id: i64,
    name: String,
    instructor: Option<String>,
}

/// Enrollment joined to the far side: `owner_id` is the id on our side.
#[derive(sqlx::FromRow)]
struct LinkRow {
    owner_id: i64,
    id: i64,
    name: String,
}

/// Quote identifier for PostgreSQL (safe: only whitelisted sort fields reach here).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn order_by(keys: &[SortKey]) -> String {
    keys.iter()
        .map(|k| {
            let collate = if TEXT_SORT_FIELDS.contains(&k.field.as_str()) {
                " COLLATE \"C\""
            } else {
                ""
            };
            format!("{}{} {}", quoted(&k.field), collate, k.direction.as_sql())
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn group_links(links: Vec<LinkRow>) -> HashMap<i64, Vec<Member>> {
    links.into_iter().fold(HashMap::new(), |mut m, l| {
        m.entry(l.owner_id).or_default().push(Member { id: l.id, name: l.name });
        m
    })
}

/// PostgreSQL-backed store. Tables come from `migration::apply_migrations`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    /// Create the database if needed and open a pool sized from config.
    pub async fn connect(config: &AppConfig) -> Result<Self, AppError> {
        ensure_database_exists(&config.database_url).await?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;
        Ok(PgStore { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn attach_courses(&self, rows: Vec<StudentRow>) -> Result<Vec<Student>, AppError> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let links = if ids.is_empty() {
            Vec::new()
        } else {
            let sql = "SELECT sc.\"student_id\" AS owner_id, c.\"id\", c.\"name\" \
                       FROM \"studcourses\" sc JOIN \"course\" c ON c.\"id\" = sc.\"course_id\" \
                       WHERE sc.\"student_id\" = ANY($1) ORDER BY c.\"id\"";
            tracing::debug!(sql = %sql, ids = ?ids, "query");
            sqlx::query_as::<_, LinkRow>(sql).bind(ids.as_slice()).fetch_all(&self.pool).await?
        };
        let mut by_student = group_links(links);
        Ok(rows
            .into_iter()
            .map(|r| Student {
                courses: by_student.remove(&r.id).unwrap_or_default(),
                id: r.id,
                name: r.name,
                email: r.email,
            })
            .collect())
    }

    async fn attach_students(&self, rows: Vec<CourseRow>) -> Result<Vec<Course>, AppError> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let links = if ids.is_empty() {
            Vec::new()
        } else {
            let sql = "SELECT sc.\"course_id\" AS owner_id, s.\"id\", s.\"name\" \
                       FROM \"studcourses\" sc JOIN \"student\" s ON s.\"id\" = sc.\"student_id\" \
                       WHERE sc.\"course_id\" = ANY($1) ORDER BY s.\"id\"";
            tracing::debug!(sql = %sql, ids = ?ids, "query");
            sqlx::query_as::<_, LinkRow>(sql).bind(ids.as_slice()).fetch_all(&self.pool).await?
        };
        let mut by_course = group_links(links);
        Ok(rows
            .into_iter()
            .map(|r| Course {
                students: by_course.remove(&r.id).unwrap_or_default(),
                id: r.id,
                name: r.name,
                instructor: r.instructor,
            })
            .collect())
    }

    async fn count(&self, table: &str) -> Result<u64, AppError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quoted(table));
        let (n,): (i64,) = sqlx::query_as(&sql).fetch_one(&self.pool).await?;
        Ok(n.max(0) as u64)
    }
}

/// Lock the referenced courses against concurrent delete and fail on the first missing id.
async fn lock_courses(conn: &mut PgConnection, ids: &[i64]) -> Result<(), AppError> {
    if ids.is_empty() {
        return Ok(());
    }
    let found: Vec<(i64,)> = sqlx::query_as("SELECT \"id\" FROM \"course\" WHERE \"id\" = ANY($1) FOR KEY SHARE")
        .bind(ids)
        .fetch_all(&mut *conn)
        .await?;
    match ids.iter().find(|id| !found.iter().any(|(f,)| f == *id)) {
        Some(id) => Err(AppError::course_not_found(*id)),
        None => Ok(()),
    }
}

async fn replace_links(conn: &mut PgConnection, student_id: i64, course_ids: &[i64]) -> Result<(), AppError> {
    sqlx::query("DELETE FROM \"studcourses\" WHERE \"student_id\" = $1")
        .bind(student_id)
        .execute(&mut *conn)
        .await?;
    if course_ids.is_empty() {
        return Ok(());
    }
    sqlx::query("INSERT INTO \"studcourses\" (\"student_id\", \"course_id\") SELECT $1, UNNEST($2::bigint[])")
        .bind(student_id)
        .bind(course_ids)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn students(&self) -> Result<Vec<Student>, AppError> {
        let sql = format!("SELECT {} FROM \"student\" ORDER BY \"id\"", STUDENT_COLUMNS);
        tracing::debug!(sql = %sql, "query");
        let rows = sqlx::query_as::<_, StudentRow>(&sql).fetch_all(&self.pool).await?;
        self.attach_courses(rows).await
    }

    async fn students_page(&self, req: &PageRequest) -> Result<Page<Student>, AppError> {
        let sql = format!(
            "SELECT {} FROM \"student\" ORDER BY {} LIMIT $1 OFFSET $2",
            STUDENT_COLUMNS,
            order_by(&req.effective_sort())
        );
        tracing::debug!(sql = %sql, page = req.page, size = req.size, "query");
        let rows = sqlx::query_as::<_, StudentRow>(&sql)
            .bind(to_i64(req.size))
            .bind(to_i64(req.offset()))
            .fetch_all(&self.pool)
            .await?;
        let total = self.count("student").await?;
        Ok(Page::new(self.attach_courses(rows).await?, total, req))
    }

    async fn student(&self, id: i64) -> Result<Option<Student>, AppError> {
        let sql = format!("SELECT {} FROM \"student\" WHERE \"id\" = $1", STUDENT_COLUMNS);
        tracing::debug!(sql = %sql, id, "query");
        let row = sqlx::query_as::<_, StudentRow>(&sql).bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(self.attach_courses(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn students_name_containing(&self, fragment: &str) -> Result<Vec<Student>, AppError> {
        // position() instead of LIKE: no wildcard escaping, and '' is found in every name.
        let sql = format!(
            "SELECT {} FROM \"student\" WHERE position($1 in \"name\") > 0 ORDER BY \"id\"",
            STUDENT_COLUMNS
        );
        tracing::debug!(sql = %sql, fragment, "query");
        let rows = sqlx::query_as::<_, StudentRow>(&sql).bind(fragment).fetch_all(&self.pool).await?;
        self.attach_courses(rows).await
    }

    async fn insert_student(&self, student: &NewStudent) -> Result<i64, AppError> {
        let mut tx = self.pool.begin().await?;
        lock_courses(&mut tx, &student.course_ids).await?;
        let (id,): (i64,) = sqlx::query_as("INSERT INTO \"student\" (\"name\", \"email\") VALUES ($1, $2) RETURNING \"id\"")
            .bind(&student.name)
            .bind(&student.email)
            .fetch_one(&mut *tx)
            .await?;
        replace_links(&mut tx, id, &student.course_ids).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn update_student(&self, student: &Student, course_ids: Option<&[i64]>) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query("UPDATE \"student\" SET \"name\" = $1, \"email\" = $2 WHERE \"id\" = $3")
            .bind(&student.name)
            .bind(&student.email)
            .bind(student.id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            return Ok(false);
        }
        if let Some(ids) = course_ids {
            lock_courses(&mut tx, ids).await?;
            replace_links(&mut tx, student.id, ids).await?;
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn delete_student(&self, id: i64) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM \"student\" WHERE \"id\" = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn courses(&self) -> Result<Vec<Course>, AppError> {
        let sql = format!("SELECT {} FROM \"course\" ORDER BY \"id\"", COURSE_COLUMNS);
        tracing::debug!(sql = %sql, "query");
        let rows = sqlx::query_as::<_, CourseRow>(&sql).fetch_all(&self.pool).await?;
        self.attach_students(rows).await
    }

    async fn courses_page(&self, req: &PageRequest) -> Result<Page<Course>, AppError> {
        let sql = format!(
            "SELECT {} FROM \"course\" ORDER BY {} LIMIT $1 OFFSET $2",
            COURSE_COLUMNS,
            order_by(&req.effective_sort())
        );
        tracing::debug!(sql = %sql, page = req.page, size = req.size, "query");
        let rows = sqlx::query_as::<_, CourseRow>(&sql)
            .bind(to_i64(req.size))
            .bind(to_i64(req.offset()))
            .fetch_all(&self.pool)
            .await?;
        let total = self.count("course").await?;
        Ok(Page::new(self.attach_students(rows).await?, total, req))
    }

    async fn course(&self, id: i64) -> Result<Option<Course>, AppError> {
        let sql = format!("SELECT {} FROM \"course\" WHERE \"id\" = $1", COURSE_COLUMNS);
        tracing::debug!(sql = %sql, id, "query");
        let row = sqlx::query_as::<_, CourseRow>(&sql).bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(self.attach_students(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn insert_course(&self, course: &NewCourse) -> Result<i64, AppError> {
        let (id,): (i64,) =
            sqlx::query_as("INSERT INTO \"course\" (\"name\", \"instructor\") VALUES ($1, $2) RETURNING \"id\"")
                .bind(&course.name)
                .bind(&course.instructor)
                .fetch_one(&self.pool)
                .await?;
        Ok(id)
    }

    async fn delete_course(&self, id: i64) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM \"course\" WHERE \"id\" = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn missing_course_ids(&self, ids: &[i64]) -> Result<Vec<i64>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found: Vec<(i64,)> = sqlx::query_as("SELECT \"id\" FROM \"course\" WHERE \"id\" = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.iter().copied().filter(|id| !found.iter().any(|(f,)| f == id)).collect())
    }

    async fn student_counts(&self) -> Result<Vec<CourseStudentCount>, AppError> {
        let sql = "SELECT c.\"id\", c.\"name\", COUNT(sc.\"student_id\") \
                   FROM \"studcourses\" sc JOIN \"course\" c ON c.\"id\" = sc.\"course_id\" \
                   GROUP BY c.\"id\", c.\"name\" ORDER BY c.\"id\"";
        tracing::debug!(sql = %sql, "query");
        let rows: Vec<(i64, String, i64)> = sqlx::query_as(sql).fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(course_id, course_name, student_count)| CourseStudentCount {
                course_id,
                course_name,
                student_count,
            })
            .collect())
    }
}

/// Where to connect to provision the service database, and its name.
struct Provisioning {
    maintenance: PgConnectOptions,
    database: String,
}

const MAINTENANCE_DB: &str = "postgres";

/// `None` when the URL names no database or names the maintenance database itself.
fn provisioning_for(database_url: &str) -> Result<Option<Provisioning>, AppError> {
    let target = PgConnectOptions::from_str(database_url).map_err(|e| {
        tracing::debug!(error = %e, "DATABASE_URL rejected");
        AppError::Config(ConfigError::InvalidValue {
            key: "DATABASE_URL",
            value: database_url.to_string(),
        })
    })?;
    let database = match target.get_database() {
        Some(name) if !name.is_empty() && name != MAINTENANCE_DB => name.to_string(),
        _ => return Ok(None),
    };
    Ok(Some(Provisioning {
        maintenance: target.database(MAINTENANCE_DB),
        database,
    }))
}

/// Creates the school database on first start so a bare PostgreSQL server is enough to run against.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let Some(Provisioning { maintenance, database }) = provisioning_for(database_url)? else {
        return Ok(());
    };
    let mut conn: PgConnection = maintenance.connect().await?;
    let present: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&database)
        .fetch_one(&mut conn)
        .await?;
    if present {
        tracing::debug!(database = %database, "school database present");
        return Ok(());
    }
    sqlx::query(&format!("CREATE DATABASE {}", quoted(&database)))
        .execute(&mut conn)
        .await?;
    tracing::info!(database = %database, "created school database");
    Ok(())
}
