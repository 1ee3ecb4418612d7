use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Caller;
use crate::database::models::{Dataset, DatasetFile, DatasetStatus, FileStatus};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{DatasetInput, FileInput, Integrity};
use crate::state::AppState;

const REQUIRED: &str = "This field is required";

#[derive(Debug, Deserialize)]
pub struct CreateDatasetRequest {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateDatasetRequest {
    fn validate(self) -> Result<DatasetInput, ApiError> {
        let mut field_errors = HashMap::new();
        if self.client_id.trim().is_empty() {
            field_errors.insert("client_id".to_string(), REQUIRED.to_string());
        }
        if self.name.trim().is_empty() {
            field_errors.insert("name".to_string(), REQUIRED.to_string());
        }
        if !field_errors.is_empty() {
            return Err(ApiError::validation_error("Invalid dataset", Some(field_errors)));
        }

        Ok(DatasetInput {
            client_id: self.client_id.trim().to_string(),
            name: self.name.trim().to_string(),
            notes: self.notes.filter(|n| !n.trim().is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AddFileRequest {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub storage_path: String,
    #[serde(default)]
    pub size_bytes: Option<i64>,
}

impl AddFileRequest {
    fn validate(self) -> Result<FileInput, ApiError> {
        let mut field_errors = HashMap::new();
        for (field, value) in [
            ("filename", &self.filename),
            ("file_type", &self.file_type),
            ("storage_path", &self.storage_path),
        ] {
            if value.trim().is_empty() {
                field_errors.insert(field.to_string(), REQUIRED.to_string());
            }
        }
        match self.size_bytes {
            None => {
                field_errors.insert("size_bytes".to_string(), REQUIRED.to_string());
            }
            Some(size) if size < 0 => {
                field_errors.insert("size_bytes".to_string(), "Must not be negative".to_string());
            }
            Some(_) => {}
        }
        if !field_errors.is_empty() {
            return Err(ApiError::validation_error("Invalid file", Some(field_errors)));
        }

        Ok(FileInput {
            filename: self.filename,
            file_type: self.file_type,
            storage_path: self.storage_path,
            size_bytes: self.size_bytes.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DatasetSummary {
    pub dataset_id: String,
    pub client_id: String,
    pub name: String,
    pub status: DatasetStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Dataset> for DatasetSummary {
    fn from(dataset: Dataset) -> Self {
        Self {
            dataset_id: dataset.id,
            client_id: dataset.client_id,
            name: dataset.name,
            status: dataset.status,
            created_at: dataset.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FileView {
    pub file_id: String,
    pub filename: String,
    pub file_type: String,
    pub storage_path: String,
    pub size_bytes: i64,
    pub status: FileStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<DatasetFile> for FileView {
    fn from(file: DatasetFile) -> Self {
        Self {
            file_id: file.id,
            filename: file.filename,
            file_type: file.file_type,
            storage_path: file.storage_path,
            size_bytes: file.size_bytes,
            status: file.status,
            created_at: file.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DatasetDetailView {
    pub dataset_id: String,
    pub client_id: String,
    pub name: String,
    pub notes: Option<String>,
    pub status: DatasetStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub files: Vec<FileView>,
    pub integrity: Integrity,
}

#[derive(Debug, Serialize)]
pub struct CreatedDataset {
    pub dataset_id: String,
    pub status: DatasetStatus,
}

#[derive(Debug, Serialize)]
pub struct CreatedFile {
    pub file_id: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub dataset_id: String,
    pub status: DatasetStatus,
    pub integrity: Integrity,
}

/// GET /datasets - Datasets of every client the caller can access
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Vec<DatasetSummary>> {
    let datasets = state.datasets.list(&caller).await?;
    Ok(ApiResponse::success(datasets.into_iter().map(DatasetSummary::from).collect()))
}

/// POST /datasets/create - Create a dataset for a client
///
/// Expected Input:
/// ```json
/// { "client_id": "uuid", "name": "Q1 bank statements", "notes": "optional" }
/// ```
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<CreateDatasetRequest>, JsonRejection>,
) -> ApiResult<CreatedDataset> {
    let Json(request) = payload?;
    let input = request.validate()?;

    let dataset = state.datasets.create(&caller, input).await?;
    Ok(ApiResponse::created(CreatedDataset {
        dataset_id: dataset.id,
        status: dataset.status,
    }))
}

/// GET /datasets/:id - Dataset with its files and integrity summary
pub async fn get(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(dataset_id): Path<String>,
) -> ApiResult<DatasetDetailView> {
    let detail = state.datasets.detail(&caller, &dataset_id).await?;
    let dataset = detail.dataset;

    Ok(ApiResponse::success(DatasetDetailView {
        dataset_id: dataset.id,
        client_id: dataset.client_id,
        name: dataset.name,
        notes: dataset.notes,
        status: dataset.status,
        created_at: dataset.created_at,
        files: detail.files.into_iter().map(FileView::from).collect(),
        integrity: detail.integrity,
    }))
}

/// POST /datasets/:id/files - Register an uploaded file against a dataset
///
/// The file itself lives in object storage; this records its metadata.
/// ```json
/// { "filename": "jan.csv", "file_type": "text/csv", "storage_path": "firm/client/jan.csv", "size_bytes": 1024 }
/// ```
pub async fn add_file(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(dataset_id): Path<String>,
    payload: Result<Json<AddFileRequest>, JsonRejection>,
) -> ApiResult<CreatedFile> {
    let Json(request) = payload?;
    let input = request.validate()?;

    let file = state.datasets.add_file(&caller, &dataset_id, input).await?;
    Ok(ApiResponse::created(CreatedFile { file_id: file.id }))
}

/// POST /datasets/:id/process - Mark the dataset and its files processed
pub async fn process(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(dataset_id): Path<String>,
) -> ApiResult<ProcessResponse> {
    let outcome = state.datasets.process(&caller, &dataset_id).await?;
    Ok(ApiResponse::success(ProcessResponse {
        dataset_id: outcome.dataset_id,
        status: outcome.status,
        integrity: outcome.integrity,
    }))
}
