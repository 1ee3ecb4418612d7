use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use url::Url;

use super::models::{
    AppUser, Client, ClientGrant, Dataset, DatasetFile, DatasetStatus, FileStatus, NewDataset,
    NewDatasetFile,
};
use super::store::{Store, StoreError};
use crate::config::SupabaseConfig;

const APP_USERS: &str = "app_users";
const CLIENTS: &str = "clients";
const CLIENT_USER_ACCESS: &str = "client_user_access";
const UPLOAD_BATCHES: &str = "upload_batches";
const UPLOADED_FILES: &str = "uploaded_files";

const DATASET_COLUMNS: &str = "id,firm_id,client_id,name,notes,status,created_at";
const FILE_COLUMNS: &str =
    "id,firm_id,client_id,dataset_id,filename,file_type,storage_path,size_bytes,status,created_at";

/// Error body returned by the data API
#[derive(Debug, Deserialize)]
struct DataApiError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

/// Store backed by the hosted project's PostgREST endpoint (`/rest/v1`),
/// authenticated with the service role key.
pub struct PostgrestStore {
    http: reqwest::Client,
    rest_url: Url,
    service_key: String,
}

impl PostgrestStore {
    pub fn new(http: reqwest::Client, config: &SupabaseConfig) -> Result<Self, StoreError> {
        let rest_url = project_url(&config.url)
            .and_then(|base| base.join("rest/v1/"))
            .map_err(|e| StoreError::Unavailable(format!("invalid project url: {}", e)))?;

        Ok(Self {
            http,
            rest_url,
            service_key: config.service_role_key.clone(),
        })
    }

    fn request(&self, method: Method, table: &str) -> Result<RequestBuilder, StoreError> {
        let url = self
            .rest_url
            .join(table)
            .map_err(|e| StoreError::Unavailable(format!("invalid table url: {}", e)))?;

        Ok(self
            .http
            .request(method, url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key))
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &'static str,
        columns: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let builder = self
            .request(Method::GET, table)?
            .query(&[("select", columns)])
            .query(filters);
        self.send(table, builder).await
    }

    async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &'static str,
        columns: &str,
        body: &B,
    ) -> Result<T, StoreError> {
        let builder = self
            .request(Method::POST, table)?
            .header("Prefer", "return=representation")
            .query(&[("select", columns)])
            .json(body);

        let mut rows: Vec<T> = self.send(table, builder).await?;
        if rows.is_empty() {
            return Err(StoreError::EmptyInsert(table));
        }
        Ok(rows.swap_remove(0))
    }

    async fn update<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &'static str,
        columns: &str,
        body: &B,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let builder = self
            .request(Method::PATCH, table)?
            .header("Prefer", "return=representation")
            .query(&[("select", columns)])
            .query(filters)
            .json(body);
        self.send(table, builder).await
    }

    async fn send<T: DeserializeOwned>(&self, table: &str, builder: RequestBuilder) -> Result<T, StoreError> {
        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        debug!("Data API {} -> {}", table, status);

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let (code, message) = match serde_json::from_str::<DataApiError>(&text) {
                Ok(body) => {
                    let message = match (body.message, body.details) {
                        (Some(m), Some(d)) => format!("{} ({})", m, d),
                        (Some(m), None) => m,
                        (None, Some(d)) => d,
                        (None, None) => text.clone(),
                    };
                    (body.code, message)
                }
                Err(_) => (None, text),
            };
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                code,
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(format!("{}: {}", table, e)))
    }
}

/// Parse the project base URL, making sure relative joins keep its path
pub(crate) fn project_url(raw: &str) -> Result<Url, url::ParseError> {
    let mut base = raw.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base)
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

/// PostgREST `in` filter with quoted members
fn in_list(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

#[async_trait]
impl Store for PostgrestStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        let response = self
            .request(Method::GET, "")?
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Rejected {
                status: response.status().as_u16(),
                code: None,
                message: "health check failed".to_string(),
            })
        }
    }

    async fn find_app_user(&self, auth_user_id: &str) -> Result<Option<AppUser>, StoreError> {
        let rows: Vec<AppUser> = self
            .select(
                APP_USERS,
                "id,auth_user_id,firm_id,email",
                &[("auth_user_id", eq(auth_user_id)), ("limit", "1".to_string())],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn accessible_client_ids(&self, user_id: &str, firm_id: &str) -> Result<Vec<String>, StoreError> {
        let rows: Vec<ClientGrant> = self
            .select(
                CLIENT_USER_ACCESS,
                "user_id,firm_id,client_id",
                &[("user_id", eq(user_id)), ("firm_id", eq(firm_id))],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| row.client_id)
            .filter(|id| !id.is_empty())
            .collect())
    }

    async fn has_client_access(&self, user_id: &str, firm_id: &str, client_id: &str) -> Result<bool, StoreError> {
        let rows: Vec<ClientGrant> = self
            .select(
                CLIENT_USER_ACCESS,
                "user_id,firm_id,client_id",
                &[
                    ("user_id", eq(user_id)),
                    ("firm_id", eq(firm_id)),
                    ("client_id", eq(client_id)),
                ],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn list_clients(&self, firm_id: &str, client_ids: &[String]) -> Result<Vec<Client>, StoreError> {
        if client_ids.is_empty() {
            return Ok(vec![]);
        }
        self.select(
            CLIENTS,
            "id,firm_id,name,created_at",
            &[
                ("firm_id", eq(firm_id)),
                ("id", in_list(client_ids)),
                ("order", "name.asc".to_string()),
            ],
        )
        .await
    }

    async fn list_datasets(&self, firm_id: &str, client_ids: &[String]) -> Result<Vec<Dataset>, StoreError> {
        if client_ids.is_empty() {
            return Ok(vec![]);
        }
        self.select(
            UPLOAD_BATCHES,
            DATASET_COLUMNS,
            &[("firm_id", eq(firm_id)), ("client_id", in_list(client_ids))],
        )
        .await
    }

    async fn get_dataset(&self, firm_id: &str, dataset_id: &str) -> Result<Option<Dataset>, StoreError> {
        let rows: Vec<Dataset> = self
            .select(
                UPLOAD_BATCHES,
                DATASET_COLUMNS,
                &[("id", eq(dataset_id)), ("firm_id", eq(firm_id))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_dataset(&self, dataset: &NewDataset) -> Result<Dataset, StoreError> {
        self.insert(UPLOAD_BATCHES, DATASET_COLUMNS, dataset).await
    }

    async fn update_dataset_status(
        &self,
        firm_id: &str,
        dataset_id: &str,
        status: DatasetStatus,
    ) -> Result<(), StoreError> {
        let _: Vec<Dataset> = self
            .update(
                UPLOAD_BATCHES,
                DATASET_COLUMNS,
                &json!({ "status": status }),
                &[("id", eq(dataset_id)), ("firm_id", eq(firm_id))],
            )
            .await?;
        Ok(())
    }

    async fn list_files(&self, firm_id: &str, dataset_id: &str) -> Result<Vec<DatasetFile>, StoreError> {
        self.select(
            UPLOADED_FILES,
            FILE_COLUMNS,
            &[("dataset_id", eq(dataset_id)), ("firm_id", eq(firm_id))],
        )
        .await
    }

    async fn insert_file(&self, file: &NewDatasetFile) -> Result<DatasetFile, StoreError> {
        self.insert(UPLOADED_FILES, FILE_COLUMNS, file).await
    }

    async fn update_file_statuses(
        &self,
        firm_id: &str,
        dataset_id: &str,
        status: FileStatus,
    ) -> Result<Vec<DatasetFile>, StoreError> {
        self.update(
            UPLOADED_FILES,
            FILE_COLUMNS,
            &json!({ "status": status }),
            &[("dataset_id", eq(dataset_id)), ("firm_id", eq(firm_id))],
        )
        .await
    }
}
