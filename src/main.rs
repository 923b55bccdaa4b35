// src/main.rs
// DOCUMENTATION: Application entry point
// PURPOSE: Initialize config, database, photo storage and start HTTP server

mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod services;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use config::Config;
use db::PgStudentStore;
use dotenv::dotenv;
use services::{PhotoStorage, StudentService, PHOTO_URL_PREFIX};
use std::sync::Arc;
use std::time::Duration;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load environment variables
    dotenv().ok();

    // 2. Load configuration
    let config = Config::from_env();

    // 3. Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        let log_level = if !config.log_level.is_empty() {
            format!("{},actix_web=info,sqlx=warn", config.log_level)
        } else {
            "info,actix_web=info,sqlx=warn".to_string()
        };
        std::env::set_var("RUST_LOG", log_level);
    }
    env_logger::init();

    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Configuration error")?;

    log::info!("Starting student-cards backend...");
    log::info!("Environment: {}", config.environment);
    log::info!(
        "Server Address: {}:{}",
        config.server_address,
        config.server_port
    );

    // 4. Initialize database connection pool and schema
    let pool = config::init_db_pool(&config)
        .await
        .context("Failed to connect to database")?;
    config::ensure_schema(&pool)
        .await
        .context("Failed to prepare database schema")?;

    // 5. Prepare photo storage
    let storage = PhotoStorage::new(&config.upload_dir);
    storage.ensure_dir().await?;
    log::info!("Serving photos from {}", config.upload_dir.display());

    let service = web::Data::new(StudentService::new(
        Arc::new(PgStudentStore::new(pool)),
        storage,
    ));

    if config.reconcile_on_startup {
        let grace = Duration::from_secs(config.orphan_grace_seconds);
        match service.reconcile_orphans(grace, config.reconcile_dry_run).await {
            Ok(report) => log::debug!(
                "Reconciliation report: {}",
                serde_json::to_string(&report).unwrap_or_default()
            ),
            Err(e) => log::warn!("Orphan reconciliation failed: {}", e),
        }
    }

    // 6. Start HTTP server
    let server_addr = format!("{}:{}", config.server_address, config.server_port);
    let config_data = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            // Application state (synchronizer and config)
            .app_data(service.clone())
            .app_data(config_data.clone())
            // Middleware
            .wrap(Logger::default())
            .wrap(actix_web::middleware::Compress::default())
            .wrap(cors_policy(&config_data.cors_allowed_origin))
            // Routes
            .configure(handlers::health_config)
            .configure(handlers::students_config)
            .service(Files::new(PHOTO_URL_PREFIX, service.storage().root()))
    })
    .bind(&server_addr)?
    .run()
    .await?;

    Ok(())
}

/// CORS policy for the browser frontend
fn cors_policy(allowed_origin: &str) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
        .supports_credentials();

    if allowed_origin.is_empty() {
        cors
    } else {
        cors.allowed_origin(allowed_origin)
    }
}
