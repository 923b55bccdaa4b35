// src/models/student.rs
// DOCUMENTATION: Core data structures for student identity cards
// PURPOSE: Database row, form input and API response models

use actix_web::web::Bytes;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A student identity-card record
/// DOCUMENTATION: Maps directly to the students table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Student {
    /// Assigned by the record store on insert
    pub id: i32,

    /// Student number (NIM)
    pub nim: String,

    pub name: String,

    pub faculty: String,

    pub major: String,

    /// `/uploads/<name>` of the stored photo, empty when none is attached
    pub photo_url: String,
}

/// Text fields submitted with a create or update request
/// DOCUMENTATION: Only presence is checked; no uniqueness or format rules
#[derive(Debug, Clone, Default, Validate)]
pub struct StudentForm {
    #[validate(length(min = 1, max = 255))]
    pub nim: String,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[validate(length(min = 1, max = 255))]
    pub faculty: String,

    #[validate(length(min = 1, max = 255))]
    pub major: String,
}

impl StudentForm {
    /// Build the record a successful insert/update will hold
    pub fn into_student(self, id: i32, photo_url: String) -> Student {
        Student {
            id,
            nim: self.nim,
            name: self.name,
            faculty: self.faculty,
            major: self.major,
            photo_url,
        }
    }
}

/// Multipart form fields as they arrive, before presence checks
#[derive(Debug, Default)]
pub struct RawStudentForm {
    pub nim: Option<String>,
    pub name: Option<String>,
    pub faculty: Option<String>,
    pub major: Option<String>,
}

impl RawStudentForm {
    /// Record a text part as sent; unknown part names are ignored
    pub fn set(&mut self, field: &str, value: String) {
        let slot = match field {
            "nim" => &mut self.nim,
            "name" => &mut self.name,
            "faculty" => &mut self.faculty,
            "major" => &mut self.major,
            _ => return,
        };
        *slot = Some(value);
    }

    /// Require every text field to be present and not only whitespace
    /// Values are kept untrimmed; returns the missing field names on failure
    pub fn into_form(self) -> Result<StudentForm, Vec<&'static str>> {
        let mut missing = Vec::new();
        let mut take = |value: Option<String>, field: &'static str| match value {
            Some(v) if !v.trim().is_empty() => v,
            _ => {
                missing.push(field);
                String::new()
            }
        };

        let form = StudentForm {
            nim: take(self.nim, "nim"),
            name: take(self.name, "name"),
            faculty: take(self.faculty, "faculty"),
            major: take(self.major, "major"),
        };

        if missing.is_empty() {
            Ok(form)
        } else {
            Err(missing)
        }
    }
}

/// A photo received with a request, fully buffered
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    /// Client-supplied filename; untrusted
    pub filename: String,
    pub bytes: Bytes,
}

/// Response for POST /students
#[derive(Debug, Serialize)]
pub struct CreateStudentResponse {
    pub success: bool,
    pub id: i32,
    pub photo_url: String,
}

/// Response for PUT /students/{id}
#[derive(Debug, Serialize)]
pub struct UpdateStudentResponse {
    pub success: bool,
    pub message: String,
    pub photo_url: String,
}

/// Response for DELETE /students/{id}
#[derive(Debug, Serialize)]
pub struct DeleteStudentResponse {
    pub success: bool,
    pub message: String,
}
