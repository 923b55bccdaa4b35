// src/services/mod.rs
// DOCUMENTATION: Services module organization
// PURPOSE: Re-export service components

pub mod photo_storage;
pub mod student_service;

pub use photo_storage::*;
pub use student_service::*;
