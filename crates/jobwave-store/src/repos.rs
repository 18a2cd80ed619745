//! Typed repositories for jobs and applications.
//!
//! Both repositories share one [`DocumentStore`]. The cross-collection reads
//! (application counts per job, applications enriched with job snapshots) are
//! done here with batched store calls and joined in process.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use jobwave_models::{
    Application, ApplicationStatus, DeleteAck, DocumentId, EnrichedApplication, Job, JobSnapshot,
    JobWithCount, UpdateAck,
};

use crate::error::{StoreError, StoreResult};
use crate::store::{DocumentStore, FieldFilter, Fields, StoredDocument};

/// Collection holding job postings.
pub const JOBS_COLLECTION: &str = "jobs";

/// Collection holding job applications.
pub const APPLICATIONS_COLLECTION: &str = "applications";

/// Repository for job documents.
#[derive(Clone)]
pub struct JobRepository {
    store: Arc<dyn DocumentStore>,
}

impl JobRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Insert a job and return its new identifier.
    pub async fn create(&self, job: Job) -> StoreResult<DocumentId> {
        let id = self
            .store
            .insert(JOBS_COLLECTION, job.without_id().fields)
            .await?;
        info!("Created job: {}", id);
        Ok(id)
    }

    /// Get a job by ID.
    pub async fn get(&self, id: &DocumentId) -> StoreResult<Option<Job>> {
        Ok(self
            .store
            .get(JOBS_COLLECTION, id)
            .await?
            .map(job_from_document))
    }

    /// List jobs, optionally only those posted by `hr_email`.
    pub async fn list(&self, hr_email: Option<&str>) -> StoreResult<Vec<Job>> {
        let filter = hr_email
            .filter(|e| !e.is_empty())
            .map(|e| FieldFilter::equal(Job::HR_EMAIL_FIELD, e));

        Ok(self
            .store
            .find(JOBS_COLLECTION, filter)
            .await?
            .into_iter()
            .map(job_from_document)
            .collect())
    }

    /// List the jobs posted by `hr_email`, each with its application count.
    ///
    /// One jobs query plus one membership query over `applications.jobId`;
    /// counts are tallied here. Jobs keep the order of the jobs query.
    pub async fn list_with_counts(&self, hr_email: &str) -> StoreResult<Vec<JobWithCount>> {
        let jobs = self.list(Some(hr_email)).await?;
        if jobs.is_empty() {
            return Ok(vec![]);
        }

        let job_ids: Vec<Value> = jobs
            .iter()
            .filter_map(|job| job.id.as_ref())
            .map(|id| Value::String(id.to_string()))
            .collect();

        let applications = self
            .store
            .find(
                APPLICATIONS_COLLECTION,
                Some(FieldFilter::any_of(Application::JOB_ID_FIELD, job_ids)),
            )
            .await?;

        let mut counts: HashMap<String, u64> = HashMap::new();
        for doc in &applications {
            if let Some(Value::String(job_id)) = doc.fields.get(Application::JOB_ID_FIELD) {
                *counts.entry(job_id.clone()).or_default() += 1;
            }
        }
        debug!(
            jobs = jobs.len(),
            applications = applications.len(),
            "Counted applications per job"
        );

        Ok(jobs
            .into_iter()
            .map(|job| {
                let count = job
                    .id
                    .as_ref()
                    .and_then(|id| counts.get(id.as_str()).copied())
                    .unwrap_or(0);
                JobWithCount::new(job, count)
            })
            .collect())
    }
}

/// Repository for application documents.
#[derive(Clone)]
pub struct ApplicationRepository {
    store: Arc<dyn DocumentStore>,
}

impl ApplicationRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Insert an application and return its new identifier.
    ///
    /// The referenced job is not checked for existence.
    pub async fn create(&self, mut application: Application) -> StoreResult<DocumentId> {
        application.id = None;
        let id = self
            .store
            .insert(APPLICATIONS_COLLECTION, to_fields(&application)?)
            .await?;
        info!("Created application {} for job {}", id, application.job_id);
        Ok(id)
    }

    /// Applications whose stored `jobId` equals `job_id` exactly.
    pub async fn list_by_job(&self, job_id: &str) -> StoreResult<Vec<Application>> {
        self.store
            .find(
                APPLICATIONS_COLLECTION,
                Some(FieldFilter::equal(Application::JOB_ID_FIELD, job_id)),
            )
            .await?
            .into_iter()
            .map(application_from_document)
            .collect()
    }

    /// An applicant's applications, each with its job's display fields.
    ///
    /// Referenced jobs are fetched in one batched get. Applications whose job
    /// id is malformed or whose job no longer exists come back without a
    /// snapshot.
    pub async fn list_for_applicant_enriched(
        &self,
        applicant_email: &str,
    ) -> StoreResult<Vec<EnrichedApplication>> {
        let applications: Vec<Application> = self
            .store
            .find(
                APPLICATIONS_COLLECTION,
                Some(FieldFilter::equal(
                    Application::APPLICANT_EMAIL_FIELD,
                    applicant_email,
                )),
            )
            .await?
            .into_iter()
            .map(application_from_document)
            .collect::<StoreResult<_>>()?;

        let job_ids: Vec<DocumentId> = {
            let mut seen = HashSet::new();
            applications
                .iter()
                .filter_map(Application::job_id_str)
                .filter(|job_id| seen.insert(*job_id))
                .filter_map(|job_id| DocumentId::parse(job_id).ok())
                .collect()
        };

        let snapshots: HashMap<String, JobSnapshot> = if job_ids.is_empty() {
            HashMap::new()
        } else {
            self.store
                .get_many(JOBS_COLLECTION, &job_ids)
                .await?
                .into_iter()
                .map(|doc| {
                    let id = doc.id.to_string();
                    (id, JobSnapshot::from(&job_from_document(doc)))
                })
                .collect()
        };

        Ok(applications
            .into_iter()
            .map(|app| {
                let snapshot = app
                    .job_id_str()
                    .and_then(|job_id| snapshots.get(job_id))
                    .cloned();
                if snapshot.is_none() {
                    warn!(
                        application_id = ?app.id.as_ref().map(DocumentId::as_str),
                        job_id = %app.job_id,
                        "Application references a missing job"
                    );
                }
                app.enrich(snapshot)
            })
            .collect())
    }

    /// Set an application's status.
    pub async fn update_status(
        &self,
        id: &DocumentId,
        status: &ApplicationStatus,
    ) -> StoreResult<UpdateAck> {
        let mut fields = Fields::new();
        fields.insert(
            Application::STATUS_FIELD.to_string(),
            Value::String(status.as_str().to_string()),
        );

        let outcome = self
            .store
            .set_fields(APPLICATIONS_COLLECTION, id, fields)
            .await?;
        if !outcome.matched {
            debug!("Status update for missing application {}", id);
        }
        Ok(UpdateAck::new(
            u64::from(outcome.matched),
            u64::from(outcome.modified),
        ))
    }

    /// Delete an application.
    pub async fn delete(&self, id: &DocumentId) -> StoreResult<DeleteAck> {
        let deleted = self.store.delete(APPLICATIONS_COLLECTION, id).await?;
        if deleted {
            info!("Deleted application {}", id);
        }
        Ok(DeleteAck::new(u64::from(deleted)))
    }
}

// ============================================================================
// Conversion helpers
// ============================================================================

fn to_fields<T: Serialize>(value: &T) -> StoreResult<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::SerializationError(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

fn from_document<T: DeserializeOwned>(doc: StoredDocument) -> StoreResult<T> {
    serde_json::from_value(Value::Object(doc.fields)).map_err(|e| {
        StoreError::SerializationError(format!("document {}: {}", doc.id, e))
    })
}

fn job_from_document(doc: StoredDocument) -> Job {
    Job {
        id: None,
        fields: doc.fields,
    }
    .with_id(doc.id)
}

fn application_from_document(doc: StoredDocument) -> StoreResult<Application> {
    let id = doc.id.clone();
    from_document::<Application>(doc).map(|app| app.with_id(id))
}
