//! Job posting models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::DocumentId;

/// A posted job opening.
///
/// Jobs carry no server-side schema. Every field the poster sends, including
/// explicit `null`s and non-string values, is stored and returned unchanged.
/// `title`, `location`, `jobType`, `category`, `salaryRange`, `description`,
/// `company`, `company_logo` and `hr_email` are the fields the backend reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Store-assigned identifier, never taken from a payload
    #[serde(rename = "_id", skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    /// Caller-supplied fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Job {
    /// Field holding the poster's email.
    pub const HR_EMAIL_FIELD: &'static str = "hr_email";
    const ID_FIELD: &'static str = "_id";

    /// Return a copy carrying the given identifier.
    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.fields.remove(Self::ID_FIELD);
        self.id = Some(id);
        self
    }

    /// Drop any identifier, assigned or caller-supplied.
    pub fn without_id(mut self) -> Self {
        self.fields.remove(Self::ID_FIELD);
        self.id = None;
        self
    }

    /// Raw value of a field, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// String value of a field. `None` when absent or not a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.get_str("title")
    }

    pub fn hr_email(&self) -> Option<&str> {
        self.get_str(Self::HR_EMAIL_FIELD)
    }
}

/// Display fields copied from a job onto an application at read time.
///
/// Values are copied as stored, so a `null` on the job shows up as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobSnapshot {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl JobSnapshot {
    /// Wire names of the snapshot fields.
    pub const FIELDS: [&'static str; 8] = [
        "title",
        "location",
        "jobType",
        "category",
        "salaryRange",
        "description",
        "company",
        "company_logo",
    ];

    /// Raw value of a snapshot field, if the job had it.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<&Job> for JobSnapshot {
    fn from(job: &Job) -> Self {
        let fields = Self::FIELDS
            .iter()
            .filter_map(|&name| job.get(name).map(|v| (name.to_string(), v.clone())))
            .collect();
        Self { fields }
    }
}

/// A job together with the number of applications it has received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobWithCount {
    #[serde(flatten)]
    pub job: Job,
    pub count: u64,
}

impl JobWithCount {
    pub fn new(mut job: Job, count: u64) -> Self {
        job.fields.remove("count");
        Self { job, count }
    }
}
