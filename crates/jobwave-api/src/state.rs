//! Application state.

use std::sync::Arc;

use tracing::info;

use jobwave_store::{
    ApplicationRepository, DocumentStore, FirestoreClient, JobRepository, MemoryStore,
};

use crate::auth::{FirebaseVerifier, IdentityVerifier, SessionKeys};
use crate::config::{ApiConfig, ConfigError, StoreBackend};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn DocumentStore>,
    pub jobs: JobRepository,
    pub applications: ApplicationRepository,
    pub sessions: Arc<SessionKeys>,
    pub identity: Arc<dyn IdentityVerifier>,
}

impl AppState {
    /// Create new application state from configuration.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::Firestore => {
                let client = FirestoreClient::from_env().await?;
                info!(
                    project_id = %client.config().project_id,
                    database_id = %client.config().database_id,
                    emulator = client.config().emulator_host.is_some(),
                    "Using Firestore store"
                );
                Arc::new(client)
            }
            StoreBackend::Memory => {
                info!("Using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let project_id = config
            .firebase_project_id
            .clone()
            .ok_or(ConfigError::Missing("FIREBASE_PROJECT_ID or GCP_PROJECT_ID"))?;
        let identity = Arc::new(FirebaseVerifier::new(project_id).await?);

        Ok(Self::with_components(config, store, identity))
    }

    /// Assemble state from already-built components.
    pub fn with_components(
        config: ApiConfig,
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityVerifier>,
    ) -> Self {
        let sessions = Arc::new(SessionKeys::new(config.session_secret.as_bytes()));
        Self {
            jobs: JobRepository::new(Arc::clone(&store)),
            applications: ApplicationRepository::new(Arc::clone(&store)),
            config,
            store,
            sessions,
            identity,
        }
    }
}
