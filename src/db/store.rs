// src/db/store.rs
// DOCUMENTATION: Record store seam
// PURPOSE: Lets the synchronizer run against Postgres or an in-memory store

use crate::errors::StudentsError;
use crate::models::{Student, StudentForm};
use async_trait::async_trait;

/// Persistence operations the photo/record synchronizer needs
/// DOCUMENTATION: Implementations own row persistence only; file side effects
/// belong to the service layer. Injected as `Arc<dyn StudentStore>`.
#[async_trait]
pub trait StudentStore: Send + Sync {
    /// All records, ordered by id
    async fn list(&self) -> Result<Vec<Student>, StudentsError>;

    /// Photo reference of a record, `None` when the id is unknown
    async fn find_photo_url(&self, id: i32) -> Result<Option<String>, StudentsError>;

    /// Insert a record and return its assigned id
    async fn insert(&self, form: &StudentForm, photo_url: &str) -> Result<i32, StudentsError>;

    /// Overwrite a record; returns rows affected
    async fn update(
        &self,
        id: i32,
        form: &StudentForm,
        photo_url: &str,
    ) -> Result<u64, StudentsError>;

    /// Remove a record; returns rows affected
    async fn delete(&self, id: i32) -> Result<u64, StudentsError>;

    /// (id, photo_url) for every record that references a photo
    async fn photo_urls(&self) -> Result<Vec<(i32, String)>, StudentsError>;

    /// Liveness check against the record store
    async fn ping(&self) -> Result<(), StudentsError>;
}
