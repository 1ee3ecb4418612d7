pub mod introspect;
pub mod jwt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::models::AppUser;

pub use introspect::IntrospectionVerifier;
pub use jwt::{Claims, JwtSecretVerifier};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header missing")]
    MissingHeader,

    #[error("Authorization header must be a Bearer token")]
    MalformedHeader,

    #[error("Invalid or expired token: {0}")]
    InvalidToken(String),

    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("User is not provisioned for any firm")]
    NotProvisioned,
}

/// Account verified by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Identity attached to every authenticated request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_user_id: String,
    pub firm_id: String,
}

impl Caller {
    pub fn new(user: AuthUser, app_user: AppUser) -> Self {
        Self {
            user_id: user.id,
            email: user.email.or(app_user.email),
            role: user.role,
            app_user_id: app_user.id,
            firm_id: app_user.firm_id,
        }
    }
}

/// Verifies bearer tokens issued by the external identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError>;
}
