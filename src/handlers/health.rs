// src/handlers/health.rs
// DOCUMENTATION: Health check handler
// PURPOSE: Report service status and record store reachability

use crate::services::StudentService;
use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

pub async fn health_check(service: web::Data<StudentService>) -> impl Responder {
    let database = if service.is_healthy().await {
        "ok"
    } else {
        "unavailable"
    };

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "student-cards",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database
    }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStudentStore;
    use crate::services::PhotoStorage;
    use actix_web::{test, App};
    use serde_json::Value;
    use std::sync::Arc;

    #[actix_rt::test]
    async fn test_health_reports_database() {
        let service = StudentService::new(
            Arc::new(MemoryStudentStore::new()),
            PhotoStorage::new("uploads"),
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], "ok");
    }
}
