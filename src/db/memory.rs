// src/db/memory.rs
// DOCUMENTATION: In-memory record store for tests

use crate::db::StudentStore;
use crate::errors::StudentsError;
use crate::models::{Student, StudentForm};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct Table {
    rows: BTreeMap<i32, Student>,
    next_id: i32,
}

/// BTreeMap-backed store; `fail_writes` makes insert/update/delete error out
#[derive(Default)]
pub struct MemoryStudentStore {
    table: RwLock<Table>,
    fail_writes: AtomicBool,
}

impl MemoryStudentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StudentsError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StudentsError::PersistenceError(
                "injected write failure".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl StudentStore for MemoryStudentStore {
    async fn list(&self) -> Result<Vec<Student>, StudentsError> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn find_photo_url(&self, id: i32) -> Result<Option<String>, StudentsError> {
        Ok(self
            .table
            .read()
            .await
            .rows
            .get(&id)
            .map(|s| s.photo_url.clone()))
    }

    async fn insert(&self, form: &StudentForm, photo_url: &str) -> Result<i32, StudentsError> {
        self.check_writable()?;
        let mut table = self.table.write().await;
        table.next_id += 1;
        let id = table.next_id;
        table
            .rows
            .insert(id, form.clone().into_student(id, photo_url.to_string()));
        Ok(id)
    }

    async fn update(
        &self,
        id: i32,
        form: &StudentForm,
        photo_url: &str,
    ) -> Result<u64, StudentsError> {
        self.check_writable()?;
        let mut table = self.table.write().await;
        match table.rows.get_mut(&id) {
            Some(row) => {
                *row = form.clone().into_student(id, photo_url.to_string());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: i32) -> Result<u64, StudentsError> {
        self.check_writable()?;
        Ok(self.table.write().await.rows.remove(&id).map_or(0, |_| 1))
    }

    async fn photo_urls(&self) -> Result<Vec<(i32, String)>, StudentsError> {
        Ok(self
            .table
            .read()
            .await
            .rows
            .values()
            .filter(|s| !s.photo_url.is_empty())
            .map(|s| (s.id, s.photo_url.clone()))
            .collect())
    }

    async fn ping(&self) -> Result<(), StudentsError> {
        Ok(())
    }
}
