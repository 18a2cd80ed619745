//! Document store access for the Job Wave backend.
//!
//! This crate provides:
//! - The `DocumentStore` abstraction over the `jobs` and `applications` collections
//! - A Firestore REST implementation with service account or emulator auth
//! - An in-memory implementation for local runs and tests
//! - Typed repositories, including the application/job join and per-job counts

pub mod client;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod repos;
pub mod store;
pub mod token_cache;
pub mod types;

#[cfg(test)]
mod client_tests;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use repos::{ApplicationRepository, JobRepository, APPLICATIONS_COLLECTION, JOBS_COLLECTION};
pub use store::{DocumentStore, FieldFilter, Fields, StoredDocument, WriteOutcome};
