//! # Infrastructure Adapters
//!
//! Infrastructure implementations of the lead repository interface.

pub mod memory_repository;
pub mod postgrest_repository;

pub use memory_repository::InMemoryLeadRepository;
pub use postgrest_repository::{PostgrestConfig, PostgrestLeadRepository};
