use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Response, StatusCode,
};
use serde::de::DeserializeOwned;

use super::{SessionStore, StoreKind};
use crate::db::{PomodoroSession, Round, RoundUpdate, SessionUpdate};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the planner's REST API (`/user/timer/...`).
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(base_url: &str, access_token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = access_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .context("invalid access token header value")?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn ensure_success(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        bail!("{what} failed with HTTP {status}: {body}")
    }

    async fn parse<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
        let response = Self::ensure_success(response, what).await?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("{what} returned an unreadable body"))
    }
}

#[async_trait]
impl SessionStore for HttpStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Remote
    }

    async fn get_today_session(&self) -> Result<Option<PomodoroSession>> {
        let response = self
            .client
            .get(self.url("/user/timer/today"))
            .send()
            .await
            .context("GET /user/timer/today failed")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = Self::ensure_success(response, "GET /user/timer/today").await?;
        let body = response
            .text()
            .await
            .context("failed to read today's session body")?;
        // The server answers `null` (or nothing) when no session exists yet.
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(None);
        }
        serde_json::from_str(trimmed)
            .map(Some)
            .context("failed to parse today's session")
    }

    async fn create_session(&self) -> Result<PomodoroSession> {
        let response = self
            .client
            .post(self.url("/user/timer"))
            .send()
            .await
            .context("POST /user/timer failed")?;
        Self::parse(response, "POST /user/timer").await
    }

    async fn insert_round(&self, session_id: &str, round: &Round) -> Result<()> {
        // Rounds are created server-side; a client-side id stays local.
        debug!(
            "Remote store does not accept client rounds; round {} of session {} stays local",
            round.id, session_id
        );
        Ok(())
    }

    async fn update_round(&self, round_id: &str, update: RoundUpdate) -> Result<Round> {
        let path = format!("/user/timer/round/{round_id}");
        let response = self
            .client
            .put(self.url(&path))
            .json(&update)
            .send()
            .await
            .with_context(|| format!("PUT {path} failed"))?;
        Self::parse(response, &format!("PUT {path}")).await
    }

    async fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> Result<PomodoroSession> {
        let path = format!("/user/timer/{session_id}");
        let response = self
            .client
            .put(self.url(&path))
            .json(&update)
            .send()
            .await
            .with_context(|| format!("PUT {path} failed"))?;
        Self::parse(response, &format!("PUT {path}")).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        if session_id.is_empty() {
            return Err(anyhow!("cannot delete a session without an id"));
        }
        let path = format!("/user/timer/{session_id}");
        let response = self
            .client
            .delete(self.url(&path))
            .send()
            .await
            .with_context(|| format!("DELETE {path} failed"))?;
        Self::ensure_success(response, &format!("DELETE {path}")).await?;
        Ok(())
    }
}
