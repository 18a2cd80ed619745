//! API routes.

use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    create_application, create_job, delete_application, end_session, get_job, health,
    issue_session, list_job_applications, list_jobs, list_jobs_with_counts,
    list_my_applications, ready, root, update_application_status,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let job_routes = Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/applications", get(list_jobs_with_counts))
        .route("/jobs/:id", get(get_job));

    let application_routes = Router::new()
        // GET is the only authenticated route (AuthorizedApplicant extractor)
        .route(
            "/applications",
            get(list_my_applications).post(create_application),
        )
        .route("/applications/job/:job_id", get(list_job_applications))
        .route(
            "/applications/:id",
            patch(update_application_status).delete(delete_application),
        );

    let session_routes = Router::new()
        .route("/jwt", post(issue_session))
        .route("/logout", post(end_session));

    let health_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(job_routes)
        .merge(application_routes)
        .merge(session_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
