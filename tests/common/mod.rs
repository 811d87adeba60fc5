#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use clevermoney_api::app::{router, AppState};
use clevermoney_api::auth::{generate_jwt, Claims};
use clevermoney_api::config::AppConfig;
use clevermoney_api::mail::{MailError, MailMessage, Mailer};

pub const PASSWORD: &str = "secret12";

/// Keeps every message instead of sending it; can be told to fail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// The reset token carried by the most recent email.
    pub fn last_reset_token(&self) -> Option<String> {
        let last = self.sent().pop()?;
        let link = last.body.split_whitespace().find(|w| w.starts_with("http"))?;
        link.rsplit('/').next().map(str::to_string)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Transport("connection refused".into()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// One isolated server: its own port, in-memory store and mailer.
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub client: reqwest::Client,
}

pub async fn spawn_server() -> Result<TestServer> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let base_url = format!("http://127.0.0.1:{}", port);

    let mut config = AppConfig::development();
    config.security.jwt_secret = "integration-test-secret".to_string();
    config.server.port = port;

    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::in_memory(config, mailer.clone());

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    Ok(TestServer {
        base_url,
        state,
        mailer,
        client: reqwest::Client::new(),
    })
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    pub fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    pub fn post(&self, path: &str, token: &str, body: Value) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token).json(&body)
    }

    pub fn put(&self, path: &str, token: &str, body: Value) -> RequestBuilder {
        self.client.put(self.url(path)).bearer_auth(token).json(&body)
    }

    pub fn delete(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(token)
    }

    pub async fn post_public(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        send(self.client.post(self.url(path)).json(&body)).await
    }

    /// Registers a user and returns `(id, token)`.
    pub async fn register(&self, name: &str, email: &str) -> Result<(String, String)> {
        let (status, body) = self
            .post_public("/users/register", json!({ "name": name, "email": email, "password": PASSWORD }))
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "register failed: {} {}", status, body);
        let id = body["data"]["_id"].as_str().context("missing id")?.to_string();
        let token = body["token"].as_str().context("missing token")?.to_string();
        Ok((id, token))
    }

    /// Signs a token for `id` as if it had been issued at `issued_at`.
    pub fn token_issued_at(&self, id: &str, issued_at: DateTime<Utc>) -> String {
        let claims = Claims::issued_at(id, "Ann", "ann@x.com", issued_at, 1);
        generate_jwt(&claims, &self.state.config.security.jwt_secret).unwrap()
    }
}

pub async fn send(request: RequestBuilder) -> Result<(StatusCode, Value)> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    Ok((status, body))
}

pub fn assert_fail(status: StatusCode, body: &Value, expected_status: StatusCode, code: &str) {
    assert_eq!(status, expected_status, "unexpected status, body: {}", body);
    assert_eq!(body["status"], "fail", "{}", body);
    assert_eq!(body["errorCode"], code, "{}", body);
    assert!(body["message"].is_string(), "{}", body);
    assert!(body["errors"].is_object(), "{}", body);
}
