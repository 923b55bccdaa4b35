// src/db/repository.rs
// DOCUMENTATION: Database access layer - all SQL queries
// PURPOSE: Abstract database operations from business logic

use crate::db::StudentStore;
use crate::errors::StudentsError;
use crate::models::{Student, StudentForm};
use async_trait::async_trait;
use sqlx::PgPool;

/// PgStudentStore: All database operations for students
/// DOCUMENTATION: Owns the pool handed out by config::init_db_pool;
/// no global connection state
#[derive(Clone)]
pub struct PgStudentStore {
    pool: PgPool,
}

impl PgStudentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StudentStore for PgStudentStore {
    /// Used by GET /students
    async fn list(&self) -> Result<Vec<Student>, StudentsError> {
        let students = sqlx::query_as::<_, Student>(
            r#"
            SELECT id, nim, name, faculty, major, photo_url
            FROM students
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            log::error!("Failed to list students: {}", e);
            StudentsError::PersistenceError(e.to_string())
        })?;

        Ok(students)
    }

    async fn find_photo_url(&self, id: i32) -> Result<Option<String>, StudentsError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT photo_url FROM students WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    log::error!("Database error fetching student {}: {}", id, e);
                    StudentsError::PersistenceError(e.to_string())
                })?;

        Ok(row.map(|(photo_url,)| photo_url))
    }

    /// Used by POST /students
    async fn insert(&self, form: &StudentForm, photo_url: &str) -> Result<i32, StudentsError> {
        let inserted: (i32,) = sqlx::query_as(
            r#"
            INSERT INTO students (nim, name, faculty, major, photo_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&form.nim)
        .bind(&form.name)
        .bind(&form.faculty)
        .bind(&form.major)
        .bind(photo_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            log::error!("Failed to create student: {}", e);
            StudentsError::PersistenceError(e.to_string())
        })?;

        log::info!("Created student with id: {}", inserted.0);
        Ok(inserted.0)
    }

    /// Used by PUT /students/{id}
    async fn update(
        &self,
        id: i32,
        form: &StudentForm,
        photo_url: &str,
    ) -> Result<u64, StudentsError> {
        let rows = sqlx::query(
            r#"
            UPDATE students
            SET nim = $1,
                name = $2,
                faculty = $3,
                major = $4,
                photo_url = $5
            WHERE id = $6
            "#,
        )
        .bind(&form.nim)
        .bind(&form.name)
        .bind(&form.faculty)
        .bind(&form.major)
        .bind(photo_url)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            log::error!("Update failed for student {}: {}", id, e);
            StudentsError::PersistenceError(e.to_string())
        })?
        .rows_affected();

        Ok(rows)
    }

    /// Hard delete; the photo file is handled by the caller
    async fn delete(&self, id: i32) -> Result<u64, StudentsError> {
        let rows = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                log::error!("Delete failed for student {}: {}", id, e);
                StudentsError::PersistenceError(e.to_string())
            })?
            .rows_affected();

        Ok(rows)
    }

    async fn photo_urls(&self) -> Result<Vec<(i32, String)>, StudentsError> {
        let rows: Vec<(i32, String)> =
            sqlx::query_as("SELECT id, photo_url FROM students WHERE photo_url <> ''")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    log::error!("Failed to collect photo references: {}", e);
                    StudentsError::PersistenceError(e.to_string())
                })?;

        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StudentsError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
