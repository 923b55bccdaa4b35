// src/handlers/multipart.rs
// DOCUMENTATION: Multipart form decoding for student requests
// PURPOSE: Buffer text fields and the optional photo with size limits

use crate::errors::StudentsError;
use crate::models::{PhotoUpload, RawStudentForm, StudentForm};
use actix_multipart::Multipart;
use actix_web::web::BytesMut;
use futures_util::TryStreamExt;

/// Name of the file part carrying the photo
const PHOTO_FIELD: &str = "photo";

/// Upper bound for a single text part
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// Drain a multipart body into a validated-for-presence form and a photo
/// DOCUMENTATION: The photo is buffered so nothing touches the storage
/// directory until the request has been checked against the record store.
/// A photo part with no filename and no bytes (an empty file input) counts
/// as absent.
pub async fn read_student_form(
    mut payload: Multipart,
    max_photo_bytes: usize,
) -> Result<(StudentForm, Option<PhotoUpload>), StudentsError> {
    let mut raw = RawStudentForm::default();
    let mut photo = None;

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().to_string();

        if name == PHOTO_FIELD {
            let filename = field
                .content_disposition()
                .get_filename()
                .unwrap_or_default()
                .to_string();

            let mut buf = BytesMut::new();
            while let Some(chunk) = field.try_next().await? {
                if buf.len() + chunk.len() > max_photo_bytes {
                    return Err(StudentsError::ValidationError(format!(
                        "photo exceeds {} bytes",
                        max_photo_bytes
                    )));
                }
                buf.extend_from_slice(&chunk);
            }

            if filename.is_empty() && buf.is_empty() {
                continue;
            }
            photo = Some(PhotoUpload {
                filename,
                bytes: buf.freeze(),
            });
        } else {
            let mut buf = BytesMut::new();
            while let Some(chunk) = field.try_next().await? {
                if buf.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
                    return Err(StudentsError::ValidationError(format!(
                        "field {} is too large",
                        name
                    )));
                }
                buf.extend_from_slice(&chunk);
            }

            let value = String::from_utf8(buf.to_vec()).map_err(|_| {
                StudentsError::ValidationError(format!("field {} is not valid UTF-8", name))
            })?;
            raw.set(&name, value);
        }
    }

    let form = raw.into_form().map_err(|missing| {
        StudentsError::ValidationError(format!("missing required field(s): {}", missing.join(", ")))
    })?;

    Ok((form, photo))
}
