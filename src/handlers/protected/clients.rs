use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::Caller;
use crate::database::models::Client;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClientSummary {
    pub client_id: String,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Client> for ClientSummary {
    fn from(client: Client) -> Self {
        Self {
            client_id: client.id,
            name: client.name,
            created_at: client.created_at,
        }
    }
}

/// GET /clients - Clients in the caller's firm the caller has been granted
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Vec<ClientSummary>> {
    let clients = state.datasets.list_clients(&caller).await?;
    Ok(ApiResponse::success(clients.into_iter().map(ClientSummary::from).collect()))
}
