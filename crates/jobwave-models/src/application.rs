//! Job application models.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{DocumentId, JobSnapshot};

/// Review status of an application.
///
/// The known values are the ones the API accepts on writes. Documents written
/// by older clients may carry other strings; those load as `Other` so reads
/// never fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApplicationStatus {
    /// Submitted, not yet looked at
    #[default]
    Pending,
    /// Under review by the poster
    Reviewing,
    /// Interview scheduled
    Interview,
    /// Offer made / hired
    Accepted,
    /// Turned down
    Rejected,
    /// Unrecognized value found in storage
    Other(String),
}

impl ApplicationStatus {
    /// Values accepted on writes.
    pub const KNOWN: [ApplicationStatus; 5] = [
        ApplicationStatus::Pending,
        ApplicationStatus::Reviewing,
        ApplicationStatus::Interview,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
    ];

    /// Get string representation of the status.
    pub fn as_str(&self) -> &str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewing => "reviewing",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Other(s) => s,
        }
    }

    /// True for every value except `Other`.
    pub fn is_known(&self) -> bool {
        !matches!(self, ApplicationStatus::Other(_))
    }
}

impl From<String> for ApplicationStatus {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => ApplicationStatus::Pending,
            "reviewing" => ApplicationStatus::Reviewing,
            "interview" => ApplicationStatus::Interview,
            "accepted" => ApplicationStatus::Accepted,
            "rejected" => ApplicationStatus::Rejected,
            _ => ApplicationStatus::Other(s),
        }
    }
}

impl From<ApplicationStatus> for String {
    fn from(status: ApplicationStatus) -> Self {
        match status {
            ApplicationStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One applicant's application to one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    /// Store-assigned identifier (absent on create payloads)
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    /// Reference to a job, normally the string form of its identifier.
    /// Stored as sent and never decoded.
    #[serde(rename = "jobId")]
    pub job_id: Value,
    #[serde(rename = "applicantEmail")]
    pub applicant_email: String,
    #[serde(default)]
    pub status: ApplicationStatus,
    /// Remaining caller-supplied fields (resume links, profiles, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Application {
    pub const JOB_ID_FIELD: &'static str = "jobId";
    pub const APPLICANT_EMAIL_FIELD: &'static str = "applicantEmail";
    pub const STATUS_FIELD: &'static str = "status";

    /// Return a copy carrying the given identifier.
    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = Some(id);
        self
    }

    /// The referenced job id when it is a string.
    pub fn job_id_str(&self) -> Option<&str> {
        self.job_id.as_str()
    }

    /// Attach a job snapshot for display.
    ///
    /// With a snapshot, the job's display fields replace any same-named
    /// fields the applicant sent. Without one the application is returned as
    /// stored.
    pub fn enrich(mut self, snapshot: Option<JobSnapshot>) -> EnrichedApplication {
        if snapshot.is_some() {
            self.extra
                .retain(|key, _| !JobSnapshot::FIELDS.contains(&key.as_str()));
        }
        EnrichedApplication {
            application: self,
            job: snapshot.unwrap_or_default(),
        }
    }
}

/// An application with the referenced job's display fields copied on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedApplication {
    #[serde(flatten)]
    pub application: Application,
    #[serde(flatten)]
    pub job: JobSnapshot,
}

/// Body of a status update.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: ApplicationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_round_trips_known_values() {
        for status in ApplicationStatus::KNOWN {
            let s: String = status.clone().into();
            assert_eq!(ApplicationStatus::from(s), status);
        }
    }

    #[test]
    fn test_status_is_case_insensitive() {
        assert_eq!(
            ApplicationStatus::from("Accepted".to_string()),
            ApplicationStatus::Accepted
        );
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let status = ApplicationStatus::from("Set Interview".to_string());
        assert!(!status.is_known());
        assert_eq!(status.as_str(), "Set Interview");
    }

    #[test]
    fn test_application_defaults_to_pending() {
        let app: Application = serde_json::from_value(json!({
            "jobId": "job1",
            "applicantEmail": "a@b.com",
            "resume": "https://example.com/cv.pdf",
        }))
        .unwrap();
        assert_eq!(app.status, ApplicationStatus::Pending);
        assert_eq!(app.extra.get("resume"), Some(&json!("https://example.com/cv.pdf")));
    }

    #[test]
    fn test_application_keeps_non_string_job_id() {
        let app: Application = serde_json::from_value(json!({
            "jobId": 123,
            "applicantEmail": "a@b.com",
        }))
        .unwrap();
        assert_eq!(app.job_id, json!(123));
        assert_eq!(app.job_id_str(), None);
    }

    #[test]
    fn test_application_requires_job_and_email() {
        assert!(serde_json::from_value::<Application>(json!({"jobId": "x"})).is_err());
    }

    #[test]
    fn test_enrich_overrides_display_fields() {
        let app: Application = serde_json::from_value(json!({
            "_id": "app1",
            "jobId": "job1",
            "applicantEmail": "a@b.com",
            "status": "pending",
            "title": "stale title",
            "github": "gh/a",
        }))
        .unwrap();
        let job: crate::Job = serde_json::from_value(json!({
            "title": "Backend Engineer",
            "company": "Acme",
            "hr_email": "hr@acme.com",
        }))
        .unwrap();
        let snapshot = JobSnapshot::from(&job);
        let value = serde_json::to_value(app.enrich(Some(snapshot))).unwrap();
        assert_eq!(
            value,
            json!({
                "_id": "app1",
                "jobId": "job1",
                "applicantEmail": "a@b.com",
                "status": "pending",
                "github": "gh/a",
                "title": "Backend Engineer",
                "company": "Acme",
            })
        );
    }

    #[test]
    fn test_enrich_without_snapshot_keeps_stored_fields() {
        let app: Application = serde_json::from_value(json!({
            "jobId": "gone",
            "applicantEmail": "a@b.com",
            "title": "kept",
        }))
        .unwrap();
        let value = serde_json::to_value(app.enrich(None)).unwrap();
        assert_eq!(value["title"], json!("kept"));
        assert!(value.get("company").is_none());
    }
}
