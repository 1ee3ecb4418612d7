use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::path::Path;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{
    AppUser, Client, ClientGrant, Dataset, DatasetFile, DatasetStatus, FileStatus, NewDataset,
    NewDatasetFile,
};
use super::store::{Store, StoreError};

/// Fixture loaded by `--seed` for the in-memory store
#[derive(Debug, Default, Deserialize)]
pub struct MemorySeed {
    #[serde(default)]
    pub app_users: Vec<AppUser>,
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub grants: Vec<ClientGrant>,
}

impl MemorySeed {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Default)]
struct Tables {
    app_users: Vec<AppUser>,
    clients: Vec<Client>,
    grants: Vec<ClientGrant>,
    datasets: Vec<Dataset>,
    files: Vec<DatasetFile>,
}

/// Process-local store with the same firm scoping rules as the hosted tables
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(seed: MemorySeed) -> Self {
        Self {
            tables: RwLock::new(Tables {
                app_users: seed.app_users,
                clients: seed.clients,
                grants: seed.grants,
                ..Default::default()
            }),
        }
    }

    pub async fn add_app_user(&self, user: AppUser) {
        self.tables.write().await.app_users.push(user);
    }

    pub async fn add_client(&self, client: Client) {
        self.tables.write().await.clients.push(client);
    }

    pub async fn grant(&self, grant: ClientGrant) {
        self.tables.write().await.grants.push(grant);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_app_user(&self, auth_user_id: &str) -> Result<Option<AppUser>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.app_users.iter().find(|u| u.auth_user_id == auth_user_id).cloned())
    }

    async fn accessible_client_ids(&self, user_id: &str, firm_id: &str) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .grants
            .iter()
            .filter(|g| g.user_id == user_id && g.firm_id == firm_id)
            .map(|g| g.client_id.clone())
            .collect())
    }

    async fn has_client_access(&self, user_id: &str, firm_id: &str, client_id: &str) -> Result<bool, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .grants
            .iter()
            .any(|g| g.user_id == user_id && g.firm_id == firm_id && g.client_id == client_id))
    }

    async fn list_clients(&self, firm_id: &str, client_ids: &[String]) -> Result<Vec<Client>, StoreError> {
        let tables = self.tables.read().await;
        let mut clients: Vec<Client> = tables
            .clients
            .iter()
            .filter(|c| c.firm_id == firm_id && client_ids.contains(&c.id))
            .cloned()
            .collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clients)
    }

    async fn list_datasets(&self, firm_id: &str, client_ids: &[String]) -> Result<Vec<Dataset>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .datasets
            .iter()
            .filter(|d| d.firm_id == firm_id && client_ids.contains(&d.client_id))
            .cloned()
            .collect())
    }

    async fn get_dataset(&self, firm_id: &str, dataset_id: &str) -> Result<Option<Dataset>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .datasets
            .iter()
            .find(|d| d.id == dataset_id && d.firm_id == firm_id)
            .cloned())
    }

    async fn insert_dataset(&self, dataset: &NewDataset) -> Result<Dataset, StoreError> {
        let row = Dataset {
            id: Uuid::new_v4().to_string(),
            firm_id: dataset.firm_id.clone(),
            client_id: dataset.client_id.clone(),
            name: dataset.name.clone(),
            notes: dataset.notes.clone(),
            status: dataset.status,
            created_at: Some(Utc::now()),
        };
        self.tables.write().await.datasets.push(row.clone());
        Ok(row)
    }

    async fn update_dataset_status(
        &self,
        firm_id: &str,
        dataset_id: &str,
        status: DatasetStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        for dataset in tables
            .datasets
            .iter_mut()
            .filter(|d| d.id == dataset_id && d.firm_id == firm_id)
        {
            dataset.status = status;
        }
        Ok(())
    }

    async fn list_files(&self, firm_id: &str, dataset_id: &str) -> Result<Vec<DatasetFile>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .files
            .iter()
            .filter(|f| f.dataset_id == dataset_id && f.firm_id == firm_id)
            .cloned()
            .collect())
    }

    async fn insert_file(&self, file: &NewDatasetFile) -> Result<DatasetFile, StoreError> {
        let row = DatasetFile {
            id: Uuid::new_v4().to_string(),
            firm_id: file.firm_id.clone(),
            client_id: file.client_id.clone(),
            dataset_id: file.dataset_id.clone(),
            filename: file.filename.clone(),
            file_type: file.file_type.clone(),
            storage_path: file.storage_path.clone(),
            size_bytes: file.size_bytes,
            status: file.status,
            created_at: Some(Utc::now()),
        };
        self.tables.write().await.files.push(row.clone());
        Ok(row)
    }

    async fn update_file_statuses(
        &self,
        firm_id: &str,
        dataset_id: &str,
        status: FileStatus,
    ) -> Result<Vec<DatasetFile>, StoreError> {
        let mut tables = self.tables.write().await;
        let mut updated = Vec::new();
        for file in tables
            .files
            .iter_mut()
            .filter(|f| f.dataset_id == dataset_id && f.firm_id == firm_id)
        {
            file.status = status;
            updated.push(file.clone());
        }
        Ok(updated)
    }
}
