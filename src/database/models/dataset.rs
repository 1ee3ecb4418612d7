use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;

/// Lifecycle of an upload batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetStatus {
    Created,
    Processing,
    Ready,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Uploaded,
    Processed,
    Error,
}

impl DatasetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetStatus::Created => "created",
            DatasetStatus::Processing => "processing",
            DatasetStatus::Ready => "ready",
            DatasetStatus::Error => "error",
        }
    }
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Uploaded => "uploaded",
            FileStatus::Processed => "processed",
            FileStatus::Error => "error",
        }
    }
}

/// Row from `upload_batches`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub firm_id: String,
    pub client_id: String,
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: DatasetStatus,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload for `upload_batches`
///
/// Schemas differ in where they record the creating user, so at most one of
/// `created_by` / `app_user_id` is set at a time.
#[derive(Debug, Clone, Serialize)]
pub struct NewDataset {
    pub firm_id: String,
    pub client_id: String,
    pub name: String,
    pub notes: Option<String>,
    pub status: DatasetStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_user_id: Option<String>,
}

/// Column an upload batch may use to reference its creator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatorColumn {
    CreatedBy,
    AppUserId,
}

impl CreatorColumn {
    /// Columns in the order inserts try them
    pub const ALL: [CreatorColumn; 2] = [CreatorColumn::CreatedBy, CreatorColumn::AppUserId];

    pub fn as_str(&self) -> &'static str {
        match self {
            CreatorColumn::CreatedBy => "created_by",
            CreatorColumn::AppUserId => "app_user_id",
        }
    }
}

impl NewDataset {
    /// Same payload with the creator recorded in `column` only
    pub fn recorded_by(&self, column: Option<CreatorColumn>, user_id: &str) -> Self {
        let mut payload = Self {
            created_by: None,
            app_user_id: None,
            ..self.clone()
        };
        match column {
            Some(CreatorColumn::CreatedBy) => payload.created_by = Some(user_id.to_string()),
            Some(CreatorColumn::AppUserId) => payload.app_user_id = Some(user_id.to_string()),
            None => {}
        }
        payload
    }
}

/// Row from `uploaded_files`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetFile {
    pub id: String,
    pub firm_id: String,
    pub client_id: String,
    pub dataset_id: String,
    pub filename: String,
    pub file_type: String,
    pub storage_path: String,
    pub size_bytes: i64,
    pub status: FileStatus,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload for `uploaded_files`
#[derive(Debug, Clone, Serialize)]
pub struct NewDatasetFile {
    pub firm_id: String,
    pub client_id: String,
    pub dataset_id: String,
    pub filename: String,
    pub file_type: String,
    pub storage_path: String,
    pub size_bytes: i64,
    pub status: FileStatus,
}
