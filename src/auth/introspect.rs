use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use super::{AuthError, AuthUser, IdentityProvider};
use crate::config::SupabaseConfig;
use crate::database::postgrest::project_url;

/// Verifies tokens by asking the provider's auth API who they belong to
pub struct IntrospectionVerifier {
    http: reqwest::Client,
    user_url: Url,
    api_key: String,
}

impl IntrospectionVerifier {
    pub fn new(http: reqwest::Client, config: &SupabaseConfig) -> Result<Self, AuthError> {
        let user_url = project_url(&config.url)
            .and_then(|base| base.join("auth/v1/user"))
            .map_err(|e| AuthError::ProviderUnavailable(format!("invalid project url: {}", e)))?;

        Ok(Self {
            http,
            user_url,
            api_key: config.service_role_key.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for IntrospectionVerifier {
    async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .http
            .get(self.user_url.clone())
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json::<AuthUser>()
                .await
                .map_err(|e| AuthError::ProviderUnavailable(format!("unexpected user payload: {}", e))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(AuthError::InvalidToken("rejected by identity provider".to_string()))
            }
            status => Err(AuthError::ProviderUnavailable(format!(
                "identity provider returned {}",
                status
            ))),
        }
    }
}
