// src/services/photo_storage.rs
// DOCUMENTATION: Local filesystem storage for uploaded student photos
// PURPOSE: Write uploads under unique names, resolve and remove stored photos

use crate::errors::StudentsError;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};

/// URL prefix under which the storage directory is served
pub const PHOTO_URL_PREFIX: &str = "/uploads";

/// Longest sanitized filename kept in a storage name
const MAX_FILENAME_LEN: usize = 100;

/// Same-second collisions tolerated before giving up
const MAX_NAME_ATTEMPTS: u32 = 100;

/// A regular file found in the storage directory
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub name: String,
    pub modified: SystemTime,
}

/// Photo storage area
/// DOCUMENTATION: Flat directory; every file is named
/// `<unix seconds>_<sanitized client filename>` and referenced as
/// `/uploads/<name>` from a student record
#[derive(Debug, Clone)]
pub struct PhotoStorage {
    root: PathBuf,
}

impl PhotoStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the storage directory if missing
    pub async fn ensure_dir(&self) -> Result<(), StudentsError> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            StudentsError::StorageError(format!(
                "cannot create upload dir {}: {}",
                self.root.display(),
                e
            ))
        })
    }

    /// Persist an upload and return the reference to embed in a record
    /// DOCUMENTATION: The client filename only contributes a sanitized suffix.
    /// Files are opened create-new, so concurrent uploads never overwrite each
    /// other; a partially written file is removed before the error is returned.
    pub async fn store_new_photo<R>(
        &self,
        reader: &mut R,
        original_filename: &str,
    ) -> Result<String, StudentsError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let timestamp = Utc::now().timestamp();
        let sanitized = sanitize_filename(original_filename);
        let (name, mut file) = self.create_unique(timestamp, &sanitized).await?;

        match write_fully(reader, &mut file).await {
            Ok(written) => {
                log::info!("Stored photo {} ({} bytes)", name, written);
                Ok(photo_url_for(&name))
            }
            Err(e) => {
                drop(file);
                let path = self.root.join(&name);
                if let Err(rm) = fs::remove_file(&path).await {
                    log::warn!("Could not remove partial upload {}: {}", path.display(), rm);
                }
                Err(StudentsError::StorageError(format!(
                    "failed to write {}: {}",
                    name, e
                )))
            }
        }
    }

    async fn create_unique(
        &self,
        timestamp: i64,
        sanitized: &str,
    ) -> Result<(String, File), StudentsError> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = storage_name(timestamp, attempt, sanitized);
            let opened = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.root.join(&name))
                .await;

            match opened {
                Ok(file) => return Ok((name, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    log::debug!("Storage name {} taken, retrying", name);
                }
                Err(e) => {
                    return Err(StudentsError::StorageError(format!(
                        "failed to create {}: {}",
                        name, e
                    )))
                }
            }
        }

        Err(StudentsError::StorageError(format!(
            "no free storage name for {} after {} attempts",
            sanitized, MAX_NAME_ATTEMPTS
        )))
    }

    /// Remove the file behind a photo reference
    /// Returns Ok(false) when the file was already gone
    pub async fn remove_photo(&self, photo_url: &str) -> Result<bool, StudentsError> {
        let path = self.resolve(photo_url).ok_or_else(|| {
            StudentsError::StorageError(format!(
                "refusing to remove {:?}: not a stored photo reference",
                photo_url
            ))
        })?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                log::info!("Removed photo {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StudentsError::StorageError(format!(
                "failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Map a `/uploads/<name>` reference onto the storage directory
    /// None for anything that is not exactly one plain path component
    pub fn resolve(&self, photo_url: &str) -> Option<PathBuf> {
        storage_name_of(photo_url).map(|name| self.root.join(name))
    }

    #[cfg(test)]
    pub async fn exists(&self, photo_url: &str) -> bool {
        match self.resolve(photo_url) {
            Some(path) => fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false),
            None => false,
        }
    }

    /// Regular files currently in the storage directory
    pub async fn list_files(&self) -> Result<Vec<StoredFile>, StudentsError> {
        let storage_err =
            |e: std::io::Error| StudentsError::StorageError(format!("cannot scan uploads: {}", e));

        let mut entries = fs::read_dir(&self.root).await.map_err(storage_err)?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(storage_err)? {
            let metadata = entry.metadata().await.map_err(storage_err)?;
            if !metadata.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                log::warn!("Skipping non UTF-8 file in uploads: {:?}", entry.file_name());
                continue;
            };
            files.push(StoredFile {
                name,
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }

        Ok(files)
    }
}

async fn write_fully<R>(reader: &mut R, file: &mut File) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let written = tokio::io::copy(reader, file).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

/// `<timestamp>_<name>`, or `<timestamp>_<n>_<name>` after a collision
fn storage_name(timestamp: i64, attempt: u32, sanitized: &str) -> String {
    if attempt == 0 {
        format!("{}_{}", timestamp, sanitized)
    } else {
        format!("{}_{}_{}", timestamp, attempt, sanitized)
    }
}

pub fn photo_url_for(storage_name: &str) -> String {
    format!("{}/{}", PHOTO_URL_PREFIX, storage_name)
}

/// Storage name referenced by a photo URL, if it is a well-formed reference
pub fn storage_name_of(photo_url: &str) -> Option<&str> {
    let name = photo_url
        .strip_prefix(PHOTO_URL_PREFIX)?
        .strip_prefix('/')?;

    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c| c == '/' || c == '\\' || c == '\0');

    plain.then_some(name)
}

/// Reduce an untrusted client filename to a safe single path component
/// DOCUMENTATION: Keeps the last path segment, maps everything outside
/// [A-Za-z0-9._-] to '_', drops leading dots and keeps the tail so the
/// extension survives truncation. Falls back to "photo".
pub fn sanitize_filename(original: &str) -> String {
    let base = original
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // ASCII only from here on, byte slicing is safe
    let mut cleaned = cleaned.trim_start_matches('.');
    if cleaned.len() > MAX_FILENAME_LEN {
        cleaned = cleaned[cleaned.len() - MAX_FILENAME_LEN..].trim_start_matches('.');
    }

    if cleaned.is_empty() {
        "photo".to_string()
    } else {
        cleaned.to_string()
    }
}
