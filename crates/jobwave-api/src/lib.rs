//! Axum HTTP API server for the Job Wave backend.
//!
//! This crate provides:
//! - Job and application REST endpoints over a document store
//! - Session cookie + Firebase ID token checks on the applicant listing
//! - Security headers, request ids and request logging
//! - Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, ConfigError, StoreBackend};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
