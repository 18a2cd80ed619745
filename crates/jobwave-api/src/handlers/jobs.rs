//! Job posting handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use tracing::info;

use jobwave_models::{InsertAck, Job, JobWithCount};

use crate::error::{ApiError, ApiResult};
use crate::handlers::{parse_id, EmailQuery};
use crate::state::AppState;

/// List jobs, optionally only those posted by `?email=`.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> ApiResult<Json<Vec<Job>>> {
    let jobs = state.jobs.list(query.email()).await?;
    Ok(Json(jobs))
}

/// Create a job posting.
pub async fn create_job(
    State(state): State<AppState>,
    Json(job): Json<Job>,
) -> ApiResult<Json<InsertAck>> {
    let id = state.jobs.create(job).await?;
    Ok(Json(InsertAck::new(id)))
}

/// Get one job. Unknown ids yield `null`.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Option<Job>>> {
    let id = parse_id(&id)?;
    Ok(Json(state.jobs.get(&id).await?))
}

/// Jobs posted by `?email=`, each with its number of applications.
pub async fn list_jobs_with_counts(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> ApiResult<Json<Vec<JobWithCount>>> {
    let email = query
        .email()
        .ok_or_else(|| ApiError::bad_request("email query parameter is required"))?;

    let jobs = state.jobs.list_with_counts(email).await?;
    info!(hr_email = %email, jobs = jobs.len(), "Listed jobs with application counts");
    Ok(Json(jobs))
}
