// src/handlers/students.rs
// DOCUMENTATION: HTTP handlers for student card operations
// PURPOSE: Decode requests, call the synchronizer, shape JSON responses

use crate::config::Config;
use crate::errors::StudentsError;
use crate::handlers::multipart::read_student_form;
use crate::models::{CreateStudentResponse, DeleteStudentResponse, UpdateStudentResponse};
use crate::services::StudentService;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};

/// GET /students
/// List every student record
pub async fn list_students(
    service: web::Data<StudentService>,
) -> Result<impl Responder, StudentsError> {
    let students = service.list_students().await?;
    Ok(HttpResponse::Ok().json(students))
}

/// POST /students
/// Create a student from a multipart form with an optional photo
pub async fn create_student(
    service: web::Data<StudentService>,
    config: web::Data<Config>,
    payload: Multipart,
) -> Result<impl Responder, StudentsError> {
    let (form, photo) = read_student_form(payload, config.max_upload_bytes).await?;
    let student = service.create_student(form, photo).await?;

    Ok(HttpResponse::Ok().json(CreateStudentResponse {
        success: true,
        id: student.id,
        photo_url: student.photo_url,
    }))
}

/// PUT /students/{id}
/// Replace a student's fields; a new photo supersedes the stored one
pub async fn update_student(
    service: web::Data<StudentService>,
    config: web::Data<Config>,
    path: web::Path<i32>,
    payload: Multipart,
) -> Result<impl Responder, StudentsError> {
    let id = path.into_inner();
    let (form, photo) = read_student_form(payload, config.max_upload_bytes).await?;
    let student = service.update_student(id, form, photo).await?;

    Ok(HttpResponse::Ok().json(UpdateStudentResponse {
        success: true,
        message: "Student updated successfully".to_string(),
        photo_url: student.photo_url,
    }))
}

/// DELETE /students/{id}
/// Delete a student and its photo
pub async fn delete_student(
    service: web::Data<StudentService>,
    path: web::Path<i32>,
) -> Result<impl Responder, StudentsError> {
    service.delete_student(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(DeleteStudentResponse {
        success: true,
        message: "Student deleted successfully".to_string(),
    }))
}

/// Configuration for student routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/students")
            .route("", web::get().to(list_students))
            .route("", web::post().to(create_student))
            .route("/{id}", web::put().to(update_student))
            .route("/{id}", web::delete().to(delete_student)),
    );
}
