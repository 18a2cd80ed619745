//! Authentication for the protected application listing.
//!
//! - `session`: HS256 session tokens carried in the `token` cookie
//! - `identity`: Firebase ID token verification (bearer header)
//! - `guard`: the ordered check that both agree with the requested email

pub mod guard;
pub mod identity;
pub mod session;

pub use guard::{AuthStage, AuthorizedApplicant};
pub use identity::{FirebaseVerifier, IdentityVerifier, VerifiedIdentity};
pub use session::{SessionClaims, SessionKeys, SESSION_COOKIE};
