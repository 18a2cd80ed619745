//! Firebase ID token verification.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Google JWKS URL for Firebase Auth.
const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Firebase token issuer prefix.
const FIREBASE_ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// JWKS cache TTL.
const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600); // 1 hour

/// Minimum spacing between refreshes triggered by an unknown key ID.
const JWKS_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Identity established by a verified bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
}

/// Verifies bearer credentials issued by an external identity provider.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify `token`, failing with `ApiError::Unauthorized` when it is not
    /// acceptable.
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, ApiError>;
}

/// Decoded Firebase ID token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseClaims {
    /// User ID
    pub sub: String,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub iss: String,
    /// Audience (Firebase project ID)
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl From<FirebaseClaims> for VerifiedIdentity {
    fn from(claims: FirebaseClaims) -> Self {
        Self {
            uid: claims.sub,
            email: claims.email,
        }
    }
}

/// JWKS response from Google.
#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<JwkKey>,
}

#[derive(Debug, Clone, Deserialize)]
struct JwkKey {
    kid: String,
    n: String,
    e: String,
}

/// Firebase verifier with cached JWKS keys.
pub struct FirebaseVerifier {
    http: Client,
    keys: RwLock<HashMap<String, DecodingKey>>,
    last_refresh: RwLock<Option<Instant>>,
    project_id: String,
}

impl FirebaseVerifier {
    /// Create a verifier for `project_id` and warm the key cache.
    ///
    /// A failed initial fetch is logged; keys are fetched again on first use.
    pub async fn new(project_id: impl Into<String>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ApiError::internal(format!("Failed to build HTTP client: {}", e)))?;

        let verifier = Self {
            http,
            keys: RwLock::new(HashMap::new()),
            last_refresh: RwLock::new(None),
            project_id: project_id.into(),
        };

        if let Err(e) = verifier.refresh_keys().await {
            warn!("Initial JWKS fetch failed: {}", e);
        }

        Ok(verifier)
    }

    /// Refresh JWKS keys from Google.
    async fn refresh_keys(&self) -> Result<(), ApiError> {
        debug!("Refreshing JWKS keys");
        *self.last_refresh.write().await = Some(Instant::now());

        let jwks: JwksResponse = self
            .http
            .get(GOOGLE_JWKS_URL)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ApiError::internal(format!("JWKS request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| ApiError::internal(format!("Invalid JWKS response: {}", e)))?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys.insert(jwk.kid, key);
                }
                Err(e) => warn!(kid = %jwk.kid, "Skipping unusable JWKS key: {}", e),
            }
        }

        let key_count = keys.len();
        *self.keys.write().await = keys;

        debug!("Refreshed {} JWKS keys", key_count);
        Ok(())
    }

    /// Get decoding key for a key ID.
    async fn get_key(&self, kid: &str) -> Option<DecodingKey> {
        let since_refresh = self.last_refresh.read().await.map(|t| t.elapsed());
        let cached = self.keys.read().await.get(kid).cloned();

        let needs_refresh = match (since_refresh, &cached) {
            (None, _) => true,
            (Some(elapsed), Some(_)) => elapsed > JWKS_CACHE_TTL,
            // Google rotates keys; an unknown kid may be a new one.
            (Some(elapsed), None) => elapsed > JWKS_MIN_REFRESH_INTERVAL,
        };

        if !needs_refresh {
            return cached;
        }

        if let Err(e) = self.refresh_keys().await {
            warn!("Failed to refresh JWKS keys: {}", e);
        }
        self.keys.read().await.get(kid).cloned()
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, ApiError> {
        let header = decode_header(token)
            .map_err(|e| ApiError::unauthorized(format!("Invalid token header: {}", e)))?;

        let kid = header
            .kid
            .ok_or_else(|| ApiError::unauthorized("Token missing key ID"))?;

        let key = self
            .get_key(&kid)
            .await
            .ok_or_else(|| ApiError::unauthorized("Unknown key ID"))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[format!("{}{}", FIREBASE_ISSUER_PREFIX, self.project_id)]);
        validation.set_audience(&[&self.project_id]);

        let token_data = decode::<FirebaseClaims>(token, &key, &validation)
            .map_err(|e| ApiError::unauthorized(format!("Token validation failed: {}", e)))?;

        Ok(VerifiedIdentity::from(token_data.claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_to_identity() {
        let claims = FirebaseClaims {
            sub: "uid-1".to_string(),
            email: Some("user@example.com".to_string()),
            email_verified: Some(true),
            iss: format!("{}demo", FIREBASE_ISSUER_PREFIX),
            aud: "demo".to_string(),
            iat: 0,
            exp: 0,
        };
        let identity = VerifiedIdentity::from(claims);
        assert_eq!(identity.uid, "uid-1");
        assert_eq!(identity.email.as_deref(), Some("user@example.com"));
    }
}
