//! Job application handlers.

use axum::extract::{Path, State};
use axum::Json;
use tracing::info;

use jobwave_models::{
    Application, ApplicationStatus, DeleteAck, EnrichedApplication, InsertAck, StatusUpdate,
    UpdateAck,
};

use crate::auth::AuthorizedApplicant;
use crate::error::{ApiError, ApiResult};
use crate::handlers::parse_id;
use crate::state::AppState;

fn ensure_known_status(status: &ApplicationStatus) -> ApiResult<()> {
    if status.is_known() {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "unknown status {:?}, expected one of: pending, reviewing, interview, accepted, rejected",
            status.as_str()
        )))
    }
}

/// The caller's own applications, with job details attached.
pub async fn list_my_applications(
    State(state): State<AppState>,
    applicant: AuthorizedApplicant,
) -> ApiResult<Json<Vec<EnrichedApplication>>> {
    let applications = state
        .applications
        .list_for_applicant_enriched(&applicant.email)
        .await?;
    Ok(Json(applications))
}

/// Submit an application.
pub async fn create_application(
    State(state): State<AppState>,
    Json(application): Json<Application>,
) -> ApiResult<Json<InsertAck>> {
    ensure_known_status(&application.status)?;
    let id = state.applications.create(application).await?;
    Ok(Json(InsertAck::new(id)))
}

/// Applications submitted for one job.
pub async fn list_job_applications(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Vec<Application>>> {
    Ok(Json(state.applications.list_by_job(&job_id).await?))
}

/// Change an application's status.
pub async fn update_application_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<Json<UpdateAck>> {
    let id = parse_id(&id)?;
    ensure_known_status(&update.status)?;

    let ack = state.applications.update_status(&id, &update.status).await?;
    info!(
        application_id = %id,
        status = %update.status,
        matched = ack.matched_count,
        modified = ack.modified_count,
        "Application status update"
    );
    Ok(Json(ack))
}

/// Withdraw an application.
pub async fn delete_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteAck>> {
    let id = parse_id(&id)?;
    Ok(Json(state.applications.delete(&id).await?))
}
