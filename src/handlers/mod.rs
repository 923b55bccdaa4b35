// src/handlers/mod.rs
// DOCUMENTATION: Handlers module organization
// PURPOSE: Re-export handler components

pub mod health;
pub mod multipart;
pub mod students;

pub use health::config as health_config;
pub use students::config as students_config;
