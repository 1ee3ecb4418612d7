#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use intake_api::auth::{Claims, JwtSecretVerifier};
use intake_api::config::AppConfig;
use intake_api::database::models::{AppUser, Client, ClientGrant};
use intake_api::database::MemoryStore;
use intake_api::AppState;

pub const JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Firm "firm-a": alice has a grant for acme, not for globex.
/// Firm "firm-b": bob has a grant for initech.
/// carol has a valid token but no app_users row.
pub const ALICE: &str = "auth-alice";
pub const BOB: &str = "auth-bob";
pub const CAROL: &str = "auth-carol";
pub const ACME: &str = "client-acme";
pub const GLOBEX: &str = "client-globex";
pub const INITECH: &str = "client-initech";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    verifier: JwtSecretVerifier,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::development()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        seed(&store).await;

        let state = AppState::new(
            config,
            store.clone(),
            Arc::new(JwtSecretVerifier::new(JWT_SECRET)),
        );

        Self {
            router: intake_api::app(state),
            store,
            verifier: JwtSecretVerifier::new(JWT_SECRET),
        }
    }

    pub fn token_for(&self, auth_user_id: &str) -> String {
        let claims = Claims::new(
            auth_user_id,
            Some(format!("{}@firm.test", auth_user_id)),
            chrono::Duration::minutes(15),
        );
        self.verifier.issue(&claims).expect("failed to sign test token")
    }

    /// Send a request through the router in-process
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        auth_header: Option<&str>,
    ) -> (StatusCode, Value) {
        send(&self.router, method, path, body, auth_header).await
    }

    /// Request as a given identity provider user
    pub async fn request_as(
        &self,
        auth_user_id: &str,
        method: &str,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let header = format!("Bearer {}", self.token_for(auth_user_id));
        self.request(method, path, body, Some(&header)).await
    }
}

/// Drive any router in-process and decode the JSON body
pub async fn send(
    router: &Router,
    method: &str,
    path: &str,
    body: Option<Value>,
    auth_header: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .uri(path)
        .method(method)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(auth) = auth_header {
        builder = builder.header(header::AUTHORIZATION, auth);
    }

    let body = match body {
        Some(v) => Body::from(serde_json::to_vec(&v).unwrap()),
        None => Body::empty(),
    };

    let response = router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()));

    (status, json)
}

async fn seed(store: &MemoryStore) {
    for (id, auth_user_id, firm_id) in [("user-alice", ALICE, "firm-a"), ("user-bob", BOB, "firm-b")] {
        store
            .add_app_user(AppUser {
                id: id.into(),
                auth_user_id: auth_user_id.into(),
                firm_id: firm_id.into(),
                email: None,
            })
            .await;
    }

    for (id, firm_id, name) in [
        (ACME, "firm-a", "Acme Bookkeeping"),
        (GLOBEX, "firm-a", "Globex Holdings"),
        (INITECH, "firm-b", "Initech"),
    ] {
        store
            .add_client(Client {
                id: id.into(),
                firm_id: firm_id.into(),
                name: name.into(),
                created_at: None,
            })
            .await;
    }

    for (user_id, firm_id, client_id) in [("user-alice", "firm-a", ACME), ("user-bob", "firm-b", INITECH)] {
        store
            .grant(ClientGrant {
                user_id: user_id.into(),
                firm_id: firm_id.into(),
                client_id: client_id.into(),
            })
            .await;
    }
}

/// The built binary running on a free port; killed on drop
pub struct TestServer {
    pub base_url: String,
    child: Child,
}

impl TestServer {
    pub fn spawn_in_memory() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_intake-api"))
            .args(["--in-memory", "--host", "127.0.0.1", "--port", &port.to_string()])
            .env("SUPABASE_JWT_SECRET", JWT_SECRET)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self { base_url, child })
    }

    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
