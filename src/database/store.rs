use async_trait::async_trait;
use thiserror::Error;

use super::models::{
    AppUser, Client, Dataset, DatasetFile, DatasetStatus, FileStatus, NewDataset, NewDatasetFile,
};

/// Errors from the data-access layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Data API unreachable: {0}")]
    Unavailable(String),

    #[error("Data API rejected request ({status}): {message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Unexpected data API response: {0}")]
    Decode(String),

    #[error("Insert into {0} returned no rows")]
    EmptyInsert(&'static str),
}

impl StoreError {
    /// True when the database refused a write because `column` does not exist
    pub fn is_missing_column(&self, column: &str) -> bool {
        match self {
            StoreError::Rejected { code, message, .. } => {
                let code_matches = matches!(code.as_deref(), Some("PGRST204") | Some("42703"));
                let message = message.to_lowercase();
                let mentions_missing = message.contains("does not exist") || message.contains("schema cache");
                message.contains(&column.to_lowercase()) && (code_matches || mentions_missing)
            }
            _ => false,
        }
    }
}

/// Firm-scoped access to the hosted tables. Every read and write names the
/// firm so that rows of other firms are never visible.
#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Look up the application user behind an identity provider account
    async fn find_app_user(&self, auth_user_id: &str) -> Result<Option<AppUser>, StoreError>;

    async fn accessible_client_ids(&self, user_id: &str, firm_id: &str) -> Result<Vec<String>, StoreError>;

    async fn has_client_access(&self, user_id: &str, firm_id: &str, client_id: &str) -> Result<bool, StoreError>;

    async fn list_clients(&self, firm_id: &str, client_ids: &[String]) -> Result<Vec<Client>, StoreError>;

    async fn list_datasets(&self, firm_id: &str, client_ids: &[String]) -> Result<Vec<Dataset>, StoreError>;

    async fn get_dataset(&self, firm_id: &str, dataset_id: &str) -> Result<Option<Dataset>, StoreError>;

    async fn insert_dataset(&self, dataset: &NewDataset) -> Result<Dataset, StoreError>;

    async fn update_dataset_status(
        &self,
        firm_id: &str,
        dataset_id: &str,
        status: DatasetStatus,
    ) -> Result<(), StoreError>;

    async fn list_files(&self, firm_id: &str, dataset_id: &str) -> Result<Vec<DatasetFile>, StoreError>;

    async fn insert_file(&self, file: &NewDatasetFile) -> Result<DatasetFile, StoreError>;

    /// Set the status of every file in a dataset, returning the updated rows
    async fn update_file_statuses(
        &self,
        firm_id: &str,
        dataset_id: &str,
        status: FileStatus,
    ) -> Result<Vec<DatasetFile>, StoreError>;
}
