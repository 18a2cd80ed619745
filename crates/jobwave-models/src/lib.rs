//! Shared data models for the Job Wave backend.
//!
//! This crate provides Serde-serializable types for:
//! - Job postings and job applications
//! - Application status values
//! - Store-assigned document identifiers
//! - Write acknowledgements returned by the API

pub mod ack;
pub mod application;
pub mod id;
pub mod job;

// Re-export common types
pub use ack::{DeleteAck, InsertAck, UpdateAck};
pub use application::{Application, ApplicationStatus, EnrichedApplication, StatusUpdate};
pub use id::{DocumentId, InvalidDocumentId};
pub use job::{Job, JobSnapshot, JobWithCount};
