//! REST client for the session service
//!
//! Plain request/response calls that precede or follow WebSocket
//! attachment; none of this is part of the real-time protocol.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::Config;

/// A session record as returned by the REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub classroom: i64,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
}

/// A classroom record as returned by the REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassroomRecord {
    pub id: i64,
    pub name: String,
    pub instructor: i64,
}

/// Client for the session REST API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.server.base_url.trim_end_matches('/').to_string(),
            token: config.server.token.clone(),
        })
    }

    /// Fetch one session record.
    pub async fn get_session(&self, id: i64) -> Result<SessionRecord> {
        self.get(&format!("/api/sessions/{id}/")).await
    }

    /// List all sessions visible to the caller.
    pub async fn list_sessions(&self) -> Result<Vec<SessionRecord>> {
        self.get("/api/sessions/").await
    }

    /// Fetch one classroom record.
    pub async fn get_classroom(&self, id: i64) -> Result<ClassroomRecord> {
        self.get(&format!("/api/classrooms/{id}/")).await
    }

    /// Create a session for a classroom (instructor only).
    pub async fn create_session(&self, classroom: i64) -> Result<SessionRecord> {
        let response = self
            .request(reqwest::Method::POST, "/api/sessions/")
            .json(&serde_json::json!({ "classroom": classroom }))
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Register attendance before attaching to the live session.
    pub async fn join_session(&self, id: i64) -> Result<()> {
        self.post_action(id, "join").await
    }

    /// Mark the caller as having left the session.
    pub async fn leave_session(&self, id: i64) -> Result<()> {
        self.post_action(id, "leave").await
    }

    /// End the session (instructor only).
    pub async fn end_session(&self, id: i64) -> Result<()> {
        self.post_action(id, "end").await
    }

    async fn post_action(&self, id: i64, action: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST, &format!("/api/sessions/{id}/{action}/"))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(anyhow!(
                "session {} request failed: {}",
                action,
                response.status()
            ))
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(reqwest::Method::GET, path).send().await?;
        Self::parse(response).await
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("request failed: {status}"));
        }
        response.json().await.context("malformed API response")
    }
}
