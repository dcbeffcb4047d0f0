//! # Course Repository
//!
//! Course names offered as autocomplete when filling in invoice course info.
//! Names are unique per tenant, ignoring case.

use billbook_core::validation::validate_name;
use billbook_core::{Clock, Course, TenantId};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct CourseRow {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Course {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

/// Repository for course names, bound to one tenant.
#[derive(Clone)]
pub struct CourseRepository {
    pool: SqlitePool,
    tenant: TenantId,
    clock: Arc<dyn Clock>,
}

impl CourseRepository {
    pub fn new(pool: SqlitePool, tenant: TenantId, clock: Arc<dyn Clock>) -> Self {
        CourseRepository { pool, tenant, clock }
    }

    /// All courses ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Course>> {
        let rows = sqlx::query_as::<_, CourseRow>(
            "SELECT id, name, created_at FROM courses WHERE user_id = ?1 ORDER BY name COLLATE NOCASE ASC",
        )
        .bind(self.tenant.as_str())
        .fetch_all(&self.pool)
        .await?;

        debug!(tenant = %self.tenant, count = rows.len(), "Listed courses");
        Ok(rows.into_iter().map(Course::from).collect())
    }

    /// Returns the course called `name` (trimmed, any case), creating it if needed.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let a = courses.find_or_create("Rust Fundamentals").await?;
    /// let b = courses.find_or_create("  rust fundamentals ").await?;
    /// assert_eq!(a.id, b.id);
    /// ```
    pub async fn find_or_create(&self, name: &str) -> DbResult<Course> {
        validate_name(name)?;
        let name = name.trim();

        // The unique (user_id, name NOCASE) index turns a duplicate into a no-op.
        let inserted = sqlx::query(
            "INSERT INTO courses (id, user_id, name, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(self.tenant.as_str())
        .bind(name)
        .bind(self.clock.now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted > 0 {
            info!(tenant = %self.tenant, name = %name, "Course created");
        }

        let row = sqlx::query_as::<_, CourseRow>(
            "SELECT id, name, created_at FROM courses WHERE user_id = ?1 AND name = ?2 COLLATE NOCASE",
        )
        .bind(self.tenant.as_str())
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Course", name))?;

        Ok(row.into())
    }
}
