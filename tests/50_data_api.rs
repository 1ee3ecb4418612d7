use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use intake_api::auth::{AuthError, Caller, IdentityProvider, IntrospectionVerifier};
use intake_api::config::SupabaseConfig;
use intake_api::database::models::{DatasetStatus, FileStatus};
use intake_api::database::{PostgrestStore, Store, StoreError};
use intake_api::services::{DatasetInput, DatasetService};

const SERVICE_KEY: &str = "service-role-key";

fn supabase(server: &MockServer) -> SupabaseConfig {
    SupabaseConfig {
        url: server.uri(),
        service_role_key: SERVICE_KEY.to_string(),
        jwt_secret: None,
        request_timeout_secs: 5,
    }
}

fn store(server: &MockServer) -> PostgrestStore {
    PostgrestStore::new(reqwest::Client::new(), &supabase(server)).expect("store")
}

fn dataset_row(id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "firm_id": "f1",
        "client_id": "c1",
        "name": "Bank feeds",
        "notes": null,
        "status": status,
        "created_at": "2025-02-01T09:00:00+00:00"
    })
}

#[tokio::test]
async fn list_datasets_sends_firm_and_client_filters() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/upload_batches"))
        .and(header("apikey", SERVICE_KEY))
        .and(header("authorization", format!("Bearer {}", SERVICE_KEY).as_str()))
        .and(query_param("firm_id", "eq.f1"))
        .and(query_param("client_id", r#"in.("c1","c2")"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([dataset_row("d1", "ready")])))
        .expect(1)
        .mount(&server)
        .await;

    let datasets = store(&server)
        .list_datasets("f1", &["c1".to_string(), "c2".to_string()])
        .await?;

    assert_eq!(datasets.len(), 1);
    assert_eq!(datasets[0].id, "d1");
    assert_eq!(datasets[0].status, DatasetStatus::Ready);
    Ok(())
}

#[tokio::test]
async fn empty_client_list_skips_the_request() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    assert!(store(&server).list_datasets("f1", &[]).await?.is_empty());
    assert!(store(&server).list_clients("f1", &[]).await?.is_empty());
    Ok(())
}

fn caller() -> Caller {
    Caller {
        user_id: "auth-1".into(),
        email: None,
        role: None,
        app_user_id: "u1".into(),
        firm_id: "f1".into(),
    }
}

fn bank_feeds() -> DatasetInput {
    DatasetInput {
        client_id: "c1".into(),
        name: "Bank feeds".into(),
        notes: None,
    }
}

async fn mount_client_grant(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/client_user_access"))
        .and(query_param("user_id", "eq.u1"))
        .and(query_param("client_id", "eq.c1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "user_id": "u1", "firm_id": "f1", "client_id": "c1" }])),
        )
        .mount(server)
        .await;
}

fn schema_cache_miss(column: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "code": "PGRST204",
        "message": format!("Could not find the '{}' column of 'upload_batches' in the schema cache", column),
        "details": null,
        "hint": null
    }))
}

fn body_lacks(field: &'static str) -> impl Fn(&Request) -> bool + Send + Sync {
    move |request: &Request| {
        serde_json::from_slice::<serde_json::Value>(&request.body)
            .map(|body| body.get(field).is_none())
            .unwrap_or(false)
    }
}

#[tokio::test]
async fn create_falls_back_to_app_user_id_column() -> Result<()> {
    let server = MockServer::start().await;
    mount_client_grant(&server).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/upload_batches"))
        .and(body_partial_json(json!({ "created_by": "u1" })))
        .respond_with(schema_cache_miss("created_by"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/upload_batches"))
        .and(header("prefer", "return=representation"))
        .and(body_partial_json(json!({
            "firm_id": "f1",
            "client_id": "c1",
            "status": "created",
            "app_user_id": "u1"
        })))
        .and(body_lacks("created_by"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([dataset_row("d-new", "created")])))
        .expect(1)
        .mount(&server)
        .await;

    let service = DatasetService::new(Arc::new(store(&server)));
    let dataset = service.create(&caller(), bank_feeds()).await?;

    assert_eq!(dataset.id, "d-new");
    assert_eq!(dataset.status, DatasetStatus::Created);
    Ok(())
}

#[tokio::test]
async fn create_without_creator_columns_inserts_bare_row() -> Result<()> {
    let server = MockServer::start().await;
    mount_client_grant(&server).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/upload_batches"))
        .and(body_partial_json(json!({ "created_by": "u1" })))
        .respond_with(schema_cache_miss("created_by"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/upload_batches"))
        .and(body_partial_json(json!({ "app_user_id": "u1" })))
        .respond_with(schema_cache_miss("app_user_id"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/upload_batches"))
        .and(body_lacks("created_by"))
        .and(body_lacks("app_user_id"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([dataset_row("d-bare", "created")])))
        .expect(1)
        .mount(&server)
        .await;

    let service = DatasetService::new(Arc::new(store(&server)));
    let dataset = service.create(&caller(), bank_feeds()).await?;

    assert_eq!(dataset.id, "d-bare");
    Ok(())
}

#[tokio::test]
async fn timestamps_without_offset_are_read_as_utc() -> Result<()> {
    let server = MockServer::start().await;
    let mut row = dataset_row("d1", "created");
    row["created_at"] = json!("2025-02-01T09:00:00.123456");
    Mock::given(method("GET"))
        .and(path("/rest/v1/upload_batches"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&server)
        .await;

    let datasets = store(&server).list_datasets("f1", &["c1".to_string()]).await?;

    let created_at = datasets[0].created_at.expect("created_at");
    assert_eq!(created_at.to_rfc3339(), "2025-02-01T09:00:00.123456+00:00");
    Ok(())
}

#[tokio::test]
async fn file_status_update_patches_by_dataset() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/uploaded_files"))
        .and(query_param("dataset_id", "eq.d1"))
        .and(query_param("firm_id", "eq.f1"))
        .and(body_json(json!({ "status": "processed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "file-1",
            "firm_id": "f1",
            "client_id": "c1",
            "dataset_id": "d1",
            "filename": "jan.csv",
            "file_type": "text/csv",
            "storage_path": "f1/c1/jan.csv",
            "size_bytes": 512,
            "status": "processed",
            "created_at": null
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let files = store(&server)
        .update_file_statuses("f1", "d1", FileStatus::Processed)
        .await?;

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].size_bytes, 512);
    assert_eq!(files[0].status, FileStatus::Processed);
    Ok(())
}

#[tokio::test]
async fn database_errors_carry_code_and_message() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/upload_batches"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "code": "XX000",
            "message": "internal error",
            "details": "disk full"
        })))
        .mount(&server)
        .await;

    let err = store(&server).get_dataset("f1", "d1").await.unwrap_err();
    match err {
        StoreError::Rejected { status, code, message } => {
            assert_eq!(status, 500);
            assert_eq!(code.as_deref(), Some("XX000"));
            assert_eq!(message, "internal error (disk full)");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn health_check_hits_rest_root() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/"))
        .and(header("apikey", SERVICE_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "swagger": "2.0" })))
        .expect(1)
        .mount(&server)
        .await;

    store(&server).health_check().await?;
    Ok(())
}

#[tokio::test]
async fn introspection_resolves_user() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("apikey", SERVICE_KEY))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "auth-1",
            "aud": "authenticated",
            "role": "authenticated",
            "email": "owner@firm.test",
            "app_metadata": { "provider": "email" }
        })))
        .mount(&server)
        .await;

    let verifier = IntrospectionVerifier::new(reqwest::Client::new(), &supabase(&server))?;
    let user = verifier.verify("user-token").await?;

    assert_eq!(user.id, "auth-1");
    assert_eq!(user.email.as_deref(), Some("owner@firm.test"));
    Ok(())
}

#[tokio::test]
async fn introspection_maps_rejections() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "invalid JWT" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer flaky"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let verifier = IntrospectionVerifier::new(reqwest::Client::new(), &supabase(&server))?;
    assert!(matches!(verifier.verify("expired").await, Err(AuthError::InvalidToken(_))));
    assert!(matches!(verifier.verify("flaky").await, Err(AuthError::ProviderUnavailable(_))));
    Ok(())
}
