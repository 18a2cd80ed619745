//! Request handlers.

pub mod applications;
pub mod health;
pub mod jobs;
pub mod session;

pub use applications::*;
pub use health::*;
pub use jobs::*;
pub use session::*;

use serde::Deserialize;

use jobwave_models::DocumentId;

use crate::error::ApiResult;

/// `?email=` query shared by the listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct EmailQuery {
    #[serde(default)]
    pub email: Option<String>,
}

impl EmailQuery {
    /// The email, treating an empty value as absent.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }
}

/// Validate a path identifier before it reaches the store.
pub(crate) fn parse_id(raw: &str) -> ApiResult<DocumentId> {
    Ok(DocumentId::parse(raw)?)
}
