use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use super::integrity::Integrity;
use crate::auth::Caller;
use crate::database::models::{
    Client, CreatorColumn, Dataset, DatasetFile, DatasetStatus, FileStatus, NewDataset, NewDatasetFile,
};
use crate::database::{Store, StoreError};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset not found")]
    NotFound,

    #[error("User does not have access to this client")]
    ClientAccessDenied,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validated input for a new dataset
#[derive(Debug, Clone)]
pub struct DatasetInput {
    pub client_id: String,
    pub name: String,
    pub notes: Option<String>,
}

/// Validated input for a file attached to a dataset
#[derive(Debug, Clone)]
pub struct FileInput {
    pub filename: String,
    pub file_type: String,
    pub storage_path: String,
    pub size_bytes: i64,
}

#[derive(Debug, Clone)]
pub struct DatasetDetail {
    pub dataset: Dataset,
    pub files: Vec<DatasetFile>,
    pub integrity: Integrity,
}

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub dataset_id: String,
    pub status: DatasetStatus,
    pub integrity: Integrity,
}

/// Client and dataset operations, always scoped to the caller's firm and
/// client grants.
#[derive(Clone)]
pub struct DatasetService {
    store: Arc<dyn Store>,
}

impl DatasetService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn require_client_access(&self, caller: &Caller, client_id: &str) -> Result<(), DatasetError> {
        let allowed = self
            .store
            .has_client_access(&caller.app_user_id, &caller.firm_id, client_id)
            .await?;

        if !allowed {
            warn!(
                "User {} denied access to client {} in firm {}",
                caller.app_user_id, client_id, caller.firm_id
            );
            return Err(DatasetError::ClientAccessDenied);
        }
        Ok(())
    }

    pub async fn accessible_client_ids(&self, caller: &Caller) -> Result<Vec<String>, DatasetError> {
        Ok(self
            .store
            .accessible_client_ids(&caller.app_user_id, &caller.firm_id)
            .await?)
    }

    pub async fn list_clients(&self, caller: &Caller) -> Result<Vec<Client>, DatasetError> {
        let client_ids = self.accessible_client_ids(caller).await?;
        if client_ids.is_empty() {
            return Ok(vec![]);
        }
        Ok(self.store.list_clients(&caller.firm_id, &client_ids).await?)
    }

    pub async fn list(&self, caller: &Caller) -> Result<Vec<Dataset>, DatasetError> {
        let client_ids = self.accessible_client_ids(caller).await?;
        if client_ids.is_empty() {
            return Ok(vec![]);
        }
        Ok(self.store.list_datasets(&caller.firm_id, &client_ids).await?)
    }

    pub async fn create(&self, caller: &Caller, input: DatasetInput) -> Result<Dataset, DatasetError> {
        self.require_client_access(caller, &input.client_id).await?;

        let payload = NewDataset {
            firm_id: caller.firm_id.clone(),
            client_id: input.client_id,
            name: input.name,
            notes: input.notes,
            status: DatasetStatus::Created,
            created_by: None,
            app_user_id: None,
        };

        let dataset = self.insert_recording_creator(&payload, &caller.app_user_id).await?;

        info!(
            "Dataset {} created for client {} by user {}",
            dataset.id, dataset.client_id, caller.app_user_id
        );
        Ok(dataset)
    }

    /// Insert an upload batch, referencing its creator through the first
    /// creator column the schema accepts. Falls back to no reference at all.
    async fn insert_recording_creator(&self, payload: &NewDataset, user_id: &str) -> Result<Dataset, StoreError> {
        for column in CreatorColumn::ALL {
            match self.store.insert_dataset(&payload.recorded_by(Some(column), user_id)).await {
                Ok(dataset) => return Ok(dataset),
                Err(e) if e.is_missing_column(column.as_str()) => {
                    warn!("upload_batches has no {} column, trying the next one", column.as_str());
                }
                // Transport failures are not a schema mismatch
                Err(e @ StoreError::Rejected { .. }) => {
                    warn!("Insert recording creator in {} rejected: {}", column.as_str(), e);
                }
                Err(e) => return Err(e),
            }
        }

        self.store.insert_dataset(&payload.recorded_by(None, user_id)).await
    }

    /// Fetch a dataset in the caller's firm and check the caller's client grant
    async fn accessible_dataset(&self, caller: &Caller, dataset_id: &str) -> Result<Dataset, DatasetError> {
        let dataset = self
            .store
            .get_dataset(&caller.firm_id, dataset_id)
            .await?
            .ok_or(DatasetError::NotFound)?;

        self.require_client_access(caller, &dataset.client_id).await?;
        Ok(dataset)
    }

    pub async fn detail(&self, caller: &Caller, dataset_id: &str) -> Result<DatasetDetail, DatasetError> {
        let dataset = self.accessible_dataset(caller, dataset_id).await?;
        let files = self.store.list_files(&caller.firm_id, dataset_id).await?;
        let integrity = Integrity::summarize(&files);

        Ok(DatasetDetail {
            dataset,
            files,
            integrity,
        })
    }

    pub async fn add_file(
        &self,
        caller: &Caller,
        dataset_id: &str,
        input: FileInput,
    ) -> Result<DatasetFile, DatasetError> {
        let dataset = self.accessible_dataset(caller, dataset_id).await?;

        let payload = NewDatasetFile {
            firm_id: caller.firm_id.clone(),
            client_id: dataset.client_id,
            dataset_id: dataset.id,
            filename: input.filename,
            file_type: input.file_type,
            storage_path: input.storage_path,
            size_bytes: input.size_bytes,
            status: FileStatus::Uploaded,
        };

        let file = self.store.insert_file(&payload).await?;
        info!("File {} attached to dataset {}", file.id, file.dataset_id);
        Ok(file)
    }

    /// Log a processing failure and make a best-effort `error` mark so the
    /// dataset never stays `processing`
    async fn fail_processing(&self, firm_id: &str, dataset_id: &str, cause: StoreError) -> DatasetError {
        error!("Processing dataset {} failed: {}", dataset_id, cause);
        if let Err(mark_err) = self
            .store
            .update_dataset_status(firm_id, dataset_id, DatasetStatus::Error)
            .await
        {
            error!("Could not mark dataset {} as failed: {}", dataset_id, mark_err);
        }
        cause.into()
    }

    /// Run processing: dataset goes `processing` → `ready`, files become
    /// `processed`. A failed update after `processing` leaves the dataset in
    /// `error`.
    pub async fn process(&self, caller: &Caller, dataset_id: &str) -> Result<ProcessOutcome, DatasetError> {
        let dataset = self.accessible_dataset(caller, dataset_id).await?;
        let firm_id = caller.firm_id.as_str();

        self.store
            .update_dataset_status(firm_id, &dataset.id, DatasetStatus::Processing)
            .await?;

        let files = match self
            .store
            .update_file_statuses(firm_id, &dataset.id, FileStatus::Processed)
            .await
        {
            Ok(files) => files,
            Err(e) => return Err(self.fail_processing(firm_id, &dataset.id, e).await),
        };

        if let Err(e) = self
            .store
            .update_dataset_status(firm_id, &dataset.id, DatasetStatus::Ready)
            .await
        {
            return Err(self.fail_processing(firm_id, &dataset.id, e).await);
        }

        info!("Dataset {} processed ({} files)", dataset.id, files.len());
        Ok(ProcessOutcome {
            dataset_id: dataset.id,
            status: DatasetStatus::Ready,
            integrity: Integrity::summarize(&files),
        })
    }
}
