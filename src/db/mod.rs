// src/db/mod.rs
// DOCUMENTATION: Database module organization
// PURPOSE: Re-export database components

#[cfg(test)]
pub mod memory;
pub mod repository;
pub mod store;

#[cfg(test)]
pub use memory::*;
pub use repository::*;
pub use store::*;
