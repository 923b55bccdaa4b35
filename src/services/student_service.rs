// src/services/student_service.rs
// DOCUMENTATION: Business logic for student records
// PURPOSE: Keep stored photo files in step with student rows

use crate::db::StudentStore;
use crate::errors::StudentsError;
use crate::models::{PhotoUpload, Student, StudentForm};
use crate::services::photo_storage::{storage_name_of, PhotoStorage};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use validator::Validate;

/// Outcome of an orphan reconciliation pass
#[derive(Debug, Default, Serialize)]
pub struct ReconcileReport {
    pub dry_run: bool,
    /// Regular files found in the storage directory
    pub scanned_files: usize,
    /// Unreferenced files removed (or that would be, on a dry run)
    pub orphans: Vec<String>,
    /// Records whose photo_url points at no stored file
    pub dangling: Vec<(i32, String)>,
    /// Orphans that could not be removed
    pub failures: Vec<String>,
}

/// StudentService: the photo/record synchronizer
/// DOCUMENTATION: Owns every file side effect of a record mutation. Writes
/// happen before the row is linked; unlinked files are removed best-effort.
///
/// No locking: two concurrent updates of the *same* record may interleave so
/// that one request's old-photo cleanup removes the other's new photo.
/// Distinct records never share files.
pub struct StudentService {
    store: Arc<dyn StudentStore>,
    storage: PhotoStorage,
}

impl StudentService {
    pub fn new(store: Arc<dyn StudentStore>, storage: PhotoStorage) -> Self {
        Self { store, storage }
    }

    pub fn storage(&self) -> &PhotoStorage {
        &self.storage
    }

    /// All records as a snapshot
    pub async fn list_students(&self) -> Result<Vec<Student>, StudentsError> {
        self.store.list().await
    }

    /// Create a record, storing its photo first when one is supplied
    /// DOCUMENTATION: A failed insert discards the just-written file
    pub async fn create_student(
        &self,
        form: StudentForm,
        photo: Option<PhotoUpload>,
    ) -> Result<Student, StudentsError> {
        validate_form(&form)?;

        let photo_url = match photo {
            Some(photo) => self.store_photo(&photo).await?,
            None => String::new(),
        };

        let id = match self.store.insert(&form, &photo_url).await {
            Ok(id) => id,
            Err(e) => {
                self.discard_photo(&photo_url, "insert failed").await;
                return Err(e);
            }
        };

        Ok(form.into_student(id, photo_url))
    }

    /// Overwrite a record's fields, optionally replacing its photo
    /// DOCUMENTATION: An unknown id is reported before the form is checked,
    /// and both happen before any file is written. The superseded file is removed before the row is
    /// rewritten. If the rewrite then fails the row still names the removed
    /// file; the new file is discarded since nothing references it.
    pub async fn update_student(
        &self,
        id: i32,
        form: StudentForm,
        photo: Option<PhotoUpload>,
    ) -> Result<Student, StudentsError> {
        let old_photo_url = self
            .store
            .find_photo_url(id)
            .await?
            .ok_or(StudentsError::NotFound)?;

        validate_form(&form)?;

        let (photo_url, replaced) = match photo {
            Some(photo) => {
                let new_photo_url = self.store_photo(&photo).await?;
                self.discard_photo(&old_photo_url, "superseded").await;
                (new_photo_url, true)
            }
            None => (old_photo_url, false),
        };

        let rows = match self.store.update(id, &form, &photo_url).await {
            Ok(rows) => rows,
            Err(e) => {
                if replaced {
                    self.discard_photo(&photo_url, "update failed").await;
                }
                return Err(e);
            }
        };

        if rows == 0 {
            log::warn!("Student {} disappeared during update", id);
            if replaced {
                self.discard_photo(&photo_url, "record gone").await;
            }
            return Err(StudentsError::NotFound);
        }

        log::info!("Updated student: {}", id);
        Ok(form.into_student(id, photo_url))
    }

    /// Delete a record and its photo file
    pub async fn delete_student(&self, id: i32) -> Result<(), StudentsError> {
        let photo_url = self
            .store
            .find_photo_url(id)
            .await?
            .ok_or(StudentsError::NotFound)?;

        self.discard_photo(&photo_url, "record deleted").await;

        let rows = self.store.delete(id).await?;
        if rows == 0 {
            return Err(StudentsError::PersistenceError(format!(
                "student {} vanished before it could be deleted",
                id
            )));
        }

        log::info!("Deleted student: {}", id);
        Ok(())
    }

    /// Remove stored photos no record references
    /// DOCUMENTATION: Files modified within `grace` are left alone since they
    /// may belong to an upload whose row is not written yet. Dangling
    /// references are reported only.
    pub async fn reconcile_orphans(
        &self,
        grace: Duration,
        dry_run: bool,
    ) -> Result<ReconcileReport, StudentsError> {
        let files = self.storage.list_files().await?;
        let references = self.store.photo_urls().await?;

        let referenced: HashSet<&str> = references
            .iter()
            .filter_map(|(_, url)| storage_name_of(url))
            .collect();
        let present: HashSet<&str> = files.iter().map(|f| f.name.as_str()).collect();

        let mut report = ReconcileReport {
            dry_run,
            scanned_files: files.len(),
            ..ReconcileReport::default()
        };

        for (id, url) in &references {
            let found = storage_name_of(url).is_some_and(|name| present.contains(name));
            if !found {
                report.dangling.push((*id, url.clone()));
            }
        }

        let now = SystemTime::now();
        for file in &files {
            if referenced.contains(file.name.as_str()) {
                continue;
            }
            let age = now.duration_since(file.modified).unwrap_or_default();
            if age < grace {
                log::debug!("Skipping recent unreferenced file {}", file.name);
                continue;
            }

            if !dry_run {
                let path = self.storage.root().join(&file.name);
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    log::warn!("Could not remove orphan {}: {}", path.display(), e);
                    report.failures.push(file.name.clone());
                    continue;
                }
            }
            report.orphans.push(file.name.clone());
        }

        log::info!(
            "Orphan reconciliation{}: {} files scanned, {} orphans, {} dangling references, {} failures",
            if dry_run { " (dry run)" } else { "" },
            report.scanned_files,
            report.orphans.len(),
            report.dangling.len(),
            report.failures.len()
        );

        Ok(report)
    }

    pub async fn is_healthy(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Record store ping failed: {}", e);
                false
            }
        }
    }

    async fn store_photo(&self, photo: &PhotoUpload) -> Result<String, StudentsError> {
        self.storage
            .store_new_photo(&mut &photo.bytes[..], &photo.filename)
            .await
    }

    /// Best-effort unlink; failures are logged, never surfaced
    async fn discard_photo(&self, photo_url: &str, reason: &str) {
        if photo_url.is_empty() {
            return;
        }
        match self.storage.remove_photo(photo_url).await {
            Ok(true) => log::debug!("Discarded photo {} ({})", photo_url, reason),
            Ok(false) => log::warn!("Photo {} already missing ({})", photo_url, reason),
            Err(e) => log::warn!("Error deleting photo {} ({}): {}", photo_url, reason, e),
        }
    }
}

/// Map validator output onto one readable line per offending field
fn validate_form(form: &StudentForm) -> Result<(), StudentsError> {
    form.validate().map_err(|errors| {
        let mut fields: Vec<&str> = errors.field_errors().keys().copied().collect();
        fields.sort_unstable();
        let message = fields
            .iter()
            .map(|field| format!("field {} must be 1-255 characters", field))
            .collect::<Vec<_>>()
            .join(", ");
        StudentsError::ValidationError(message)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStudentStore;
    use crate::models::RawStudentForm;
    use actix_web::web::Bytes;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    const PNG: &[u8] = &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

    struct Fixture {
        _dir: TempDir,
        store: Arc<MemoryStudentStore>,
        service: StudentService,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStudentStore::new());
        let service = StudentService::new(store.clone(), PhotoStorage::new(dir.path()));
        Fixture {
            _dir: dir,
            store,
            service,
        }
    }

    fn form(nim: &str, name: &str) -> StudentForm {
        StudentForm {
            nim: nim.to_string(),
            name: name.to_string(),
            faculty: "Engineering".to_string(),
            major: "Informatics".to_string(),
        }
    }

    fn photo(filename: &str, bytes: &'static [u8]) -> Option<PhotoUpload> {
        Some(PhotoUpload {
            filename: filename.to_string(),
            bytes: Bytes::from_static(bytes),
        })
    }

    async fn file_count(service: &StudentService) -> usize {
        service.storage().list_files().await.unwrap().len()
    }

    async fn read_photo(service: &StudentService, url: &str) -> Vec<u8> {
        tokio::fs::read(service.storage().resolve(url).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_with_photo_stores_bytes() {
        let f = fixture();

        let student = assert_ok!(
            f.service
                .create_student(form("2021001", "Alice"), photo("alice.png", PNG))
                .await
        );

        assert!(student.photo_url.starts_with("/uploads/"));
        assert_eq!(read_photo(&f.service, &student.photo_url).await, PNG);
    }

    #[tokio::test]
    async fn test_create_then_list_round_trips_fields() {
        let f = fixture();
        let created = f
            .service
            .create_student(form("2021001", "Alice"), None)
            .await
            .unwrap();

        let listed = f.service.list_students().await.unwrap();
        assert_eq!(listed, vec![created.clone()]);
        assert_eq!(created.nim, "2021001");
        assert_eq!(created.name, "Alice");
        assert_eq!(created.photo_url, "");
        assert_eq!(file_count(&f.service).await, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_fields_without_writing() {
        let f = fixture();
        let mut bad = form("2021001", "Alice");
        bad.faculty.clear();

        let err = f
            .service
            .create_student(bad, photo("alice.png", PNG))
            .await
            .unwrap_err();

        assert!(matches!(err, StudentsError::ValidationError(_)));
        assert_eq!(file_count(&f.service).await, 0);
    }

    #[tokio::test]
    async fn test_failed_insert_discards_new_photo() {
        let f = fixture();
        f.store.fail_writes(true);

        let err = f
            .service
            .create_student(form("2021001", "Alice"), photo("alice.png", PNG))
            .await
            .unwrap_err();

        assert!(matches!(err, StudentsError::PersistenceError(_)));
        assert_eq!(file_count(&f.service).await, 0);
    }

    #[tokio::test]
    async fn test_update_replaces_photo_file() {
        let f = fixture();
        let created = f
            .service
            .create_student(form("2021001", "Alice"), photo("old.png", b"old"))
            .await
            .unwrap();

        let updated = f
            .service
            .update_student(created.id, form("2021001", "Alice B"), photo("new.png", b"new"))
            .await
            .unwrap();

        assert_ne!(updated.photo_url, created.photo_url);
        assert!(!f.service.storage().exists(&created.photo_url).await);
        assert_eq!(read_photo(&f.service, &updated.photo_url).await, b"new");

        let listed = f.service.list_students().await.unwrap();
        assert_eq!(listed[0].name, "Alice B");
        assert_eq!(listed[0].photo_url, updated.photo_url);
    }

    #[tokio::test]
    async fn test_update_without_photo_keeps_reference() {
        let f = fixture();
        let created = f
            .service
            .create_student(form("2021001", "Alice"), photo("a.png", PNG))
            .await
            .unwrap();

        let updated = f
            .service
            .update_student(created.id, form("2021002", "Alice"), None)
            .await
            .unwrap();

        assert_eq!(updated.photo_url, created.photo_url);
        assert_eq!(updated.nim, "2021002");
        assert!(f.service.storage().exists(&created.photo_url).await);
    }

    #[tokio::test]
    async fn test_update_unknown_id_has_no_side_effects() {
        let f = fixture();

        let err = f
            .service
            .update_student(999, form("2021001", "Alice"), photo("a.png", PNG))
            .await
            .unwrap_err();

        assert!(matches!(err, StudentsError::NotFound));
        assert_eq!(file_count(&f.service).await, 0);
    }

    #[tokio::test]
    async fn test_update_unknown_id_with_missing_fields_is_not_found() {
        let f = fixture();

        let err = f
            .service
            .update_student(999, StudentForm::default(), photo("a.png", PNG))
            .await
            .unwrap_err();

        assert!(matches!(err, StudentsError::NotFound));
        assert_eq!(file_count(&f.service).await, 0);
    }

    #[tokio::test]
    async fn test_update_known_id_with_blank_field_writes_nothing() {
        let f = fixture();
        let created = f
            .service
            .create_student(form("2021001", "Alice"), photo("a.png", PNG))
            .await
            .unwrap();
        let mut bad = form("2021001", "Alice");
        bad.name.clear();

        let err = f
            .service
            .update_student(created.id, bad, photo("b.png", PNG))
            .await
            .unwrap_err();

        assert!(matches!(err, StudentsError::ValidationError(_)));
        assert_eq!(file_count(&f.service).await, 1);
        assert!(f.service.storage().exists(&created.photo_url).await);
    }

    #[tokio::test]
    async fn test_validation_message_names_fields() {
        let f = fixture();
        let mut bad = form(&"1".repeat(256), "Alice");
        bad.major.clear();

        let err = f.service.create_student(bad, None).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Validation error: field major must be 1-255 characters, field nim must be 1-255 characters"
        );
    }

    #[tokio::test]
    async fn test_create_keeps_surrounding_whitespace() {
        let f = fixture();

        let mut raw = RawStudentForm::default();
        raw.set("nim", " 2021001".to_string());
        raw.set("name", " Alice  Smith ".to_string());
        raw.set("faculty", "Engineering".to_string());
        raw.set("major", "Informatics ".to_string());
        let submitted = raw.into_form().unwrap();

        f.service.create_student(submitted, None).await.unwrap();

        let listed = f.service.list_students().await.unwrap();
        assert_eq!(listed[0].nim, " 2021001");
        assert_eq!(listed[0].name, " Alice  Smith ");
        assert_eq!(listed[0].major, "Informatics ");
    }

    #[tokio::test]
    async fn test_failed_update_discards_new_photo() {
        let f = fixture();
        let created = f
            .service
            .create_student(form("2021001", "Alice"), photo("old.png", b"old"))
            .await
            .unwrap();
        f.store.fail_writes(true);

        let err = f
            .service
            .update_student(created.id, form("2021001", "Alice"), photo("new.png", b"new"))
            .await
            .unwrap_err();

        assert!(matches!(err, StudentsError::PersistenceError(_)));
        // The old photo was already unlinked before the write was attempted
        assert_eq!(file_count(&f.service).await, 0);
        let listed = f.service.list_students().await.unwrap();
        assert_eq!(listed[0].photo_url, created.photo_url);
    }

    #[tokio::test]
    async fn test_updates_to_distinct_records_do_not_interfere() {
        let f = fixture();
        let a = f
            .service
            .create_student(form("1", "A"), photo("same.png", b"a0"))
            .await
            .unwrap();
        let b = f
            .service
            .create_student(form("2", "B"), photo("same.png", b"b0"))
            .await
            .unwrap();

        let (a2, b2) = tokio::join!(
            f.service
                .update_student(a.id, form("1", "A"), photo("same.png", b"a1")),
            f.service
                .update_student(b.id, form("2", "B"), photo("same.png", b"b1")),
        );
        let (a2, b2) = (a2.unwrap(), b2.unwrap());

        assert_eq!(read_photo(&f.service, &a2.photo_url).await, b"a1");
        assert_eq!(read_photo(&f.service, &b2.photo_url).await, b"b1");
        assert_eq!(file_count(&f.service).await, 2);
    }

    #[tokio::test]
    async fn test_delete_removes_row_and_photo() {
        let f = fixture();
        let keep = f
            .service
            .create_student(form("1", "Keep"), photo("keep.png", b"keep"))
            .await
            .unwrap();
        let gone = f
            .service
            .create_student(form("2", "Gone"), photo("gone.png", b"gone"))
            .await
            .unwrap();

        assert_ok!(f.service.delete_student(gone.id).await);

        let listed = f.service.list_students().await.unwrap();
        assert_eq!(listed, vec![keep.clone()]);
        assert!(!f.service.storage().exists(&gone.photo_url).await);
        assert!(f.service.storage().exists(&keep.photo_url).await);
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_photo_file() {
        let f = fixture();
        let created = f
            .service
            .create_student(form("1", "A"), photo("a.png", PNG))
            .await
            .unwrap();
        f.service
            .storage()
            .remove_photo(&created.photo_url)
            .await
            .unwrap();

        assert_ok!(f.service.delete_student(created.id).await);
        assert!(f.service.list_students().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_not_found() {
        let f = fixture();
        let existing = f
            .service
            .create_student(form("1", "A"), photo("a.png", PNG))
            .await
            .unwrap();

        let err = f.service.delete_student(999).await.unwrap_err();

        assert!(matches!(err, StudentsError::NotFound));
        assert!(f.service.storage().exists(&existing.photo_url).await);
    }

    #[tokio::test]
    async fn test_delete_store_failure_surfaces() {
        let f = fixture();
        let created = f
            .service
            .create_student(form("1", "A"), None)
            .await
            .unwrap();
        f.store.fail_writes(true);

        let err = f.service.delete_student(created.id).await.unwrap_err();
        assert!(matches!(err, StudentsError::PersistenceError(_)));
    }

    #[tokio::test]
    async fn test_reconcile_removes_only_orphans() {
        let f = fixture();
        let kept = f
            .service
            .create_student(form("1", "A"), photo("kept.png", b"kept"))
            .await
            .unwrap();
        let orphan_url = f
            .service
            .storage()
            .store_new_photo(&mut &b"orphan"[..], "orphan.png")
            .await
            .unwrap();

        let report = f
            .service
            .reconcile_orphans(Duration::ZERO, false)
            .await
            .unwrap();

        assert_eq!(report.scanned_files, 2);
        assert_eq!(report.orphans.len(), 1);
        assert!(report.dangling.is_empty());
        assert!(!f.service.storage().exists(&orphan_url).await);
        assert!(f.service.storage().exists(&kept.photo_url).await);
    }

    #[tokio::test]
    async fn test_reconcile_dry_run_and_grace_keep_files() {
        let f = fixture();
        let orphan_url = f
            .service
            .storage()
            .store_new_photo(&mut &b"orphan"[..], "orphan.png")
            .await
            .unwrap();

        let dry = f
            .service
            .reconcile_orphans(Duration::ZERO, true)
            .await
            .unwrap();
        assert_eq!(dry.orphans.len(), 1);
        assert!(f.service.storage().exists(&orphan_url).await);

        let young = f
            .service
            .reconcile_orphans(Duration::from_secs(3600), false)
            .await
            .unwrap();
        assert!(young.orphans.is_empty());
        assert!(f.service.storage().exists(&orphan_url).await);
    }

    #[tokio::test]
    async fn test_reconcile_reports_dangling_references() {
        let f = fixture();
        let created = f
            .service
            .create_student(form("1", "A"), photo("a.png", PNG))
            .await
            .unwrap();
        f.service
            .storage()
            .remove_photo(&created.photo_url)
            .await
            .unwrap();

        let report = f
            .service
            .reconcile_orphans(Duration::ZERO, false)
            .await
            .unwrap();

        assert_eq!(report.dangling, vec![(created.id, created.photo_url)]);
        assert!(report.orphans.is_empty());
    }
}
