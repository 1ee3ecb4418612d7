use serde::{Deserialize, Serialize};

/// Row from `app_users`, linking an identity provider account to a firm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUser {
    pub id: String,
    pub auth_user_id: String,
    pub firm_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Row from `client_user_access`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientGrant {
    pub user_id: String,
    pub firm_id: String,
    pub client_id: String,
}
