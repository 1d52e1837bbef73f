//! HTTP data source for the backend API
//!
//! [`HttpSource`] wraps a reqwest client plus an owned current-thread
//! tokio runtime. The feed worker is a blocking loop, so each request is
//! driven to completion with `block_on`; fetches therefore never overlap
//! and a slow response delays the next tick instead of racing it.
//!
//! # Authentication
//!
//! Requests carry an optional bearer token. Two response shapes count as
//! an auth challenge and map to [`DashError::AuthRequired`]: an explicit
//! 401/403 status, and an HTML body on a JSON endpoint (a session-login
//! backend answers unauthenticated API requests with its login page).

use reqwest::header::CONTENT_TYPE;
use reqwest::{Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::error::{DashError, Result};
use crate::feed::source::{DataSource, HistoryRange, HistoryRecord, LiveSample};

/// Register definition document
const SCHEMA_ENDPOINT: &str = "/api/registers/definitions";
/// Latest live sample
const LIVE_ENDPOINT: &str = "/api/live-data";
/// Historical records for a range
const HISTORY_ENDPOINT: &str = "/api/historical-data";
/// CSV export payload
const EXPORT_ENDPOINT: &str = "/api/historical-data/export";

/// reqwest-backed [`DataSource`]
pub struct HttpSource {
    http: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    base_url: String,
    token: Option<String>,
}

impl HttpSource {
    /// Build a source for the given backend base URL
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        token: Option<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DashError::Http)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            http,
            runtime,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map auth challenges before generic status handling
    fn check_auth(response: &Response) -> Result<()> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DashError::AuthRequired);
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if content_type.contains("text/html") {
            return Err(DashError::AuthRequired);
        }
        Ok(())
    }

    fn get(&mut self, path: &str, query: &[(&str, String)]) -> Result<Response> {
        let url = self.endpoint(path);
        let token = self.token.clone();
        let request = self.http.get(&url).query(query);
        let request = match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = self
            .runtime
            .block_on(request.send())
            .map_err(DashError::Http)?;

        Self::check_auth(&response)?;
        if !response.status().is_success() {
            return Err(DashError::Fetch(format!(
                "{} returned {}",
                path,
                response.status()
            )));
        }
        Ok(response)
    }

    fn get_json(&mut self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let response = self.get(path, query)?;
        self.runtime
            .block_on(response.json::<Value>())
            .map_err(DashError::Http)
    }
}

impl DataSource for HttpSource {
    fn fetch_schema(&mut self) -> Result<Value> {
        self.get_json(SCHEMA_ENDPOINT, &[])
    }

    fn fetch_live(&mut self) -> Result<LiveSample> {
        let raw = self.get_json(LIVE_ENDPOINT, &[])?;
        serde_json::from_value(raw).map_err(DashError::Json)
    }

    fn fetch_history(&mut self, range: &HistoryRange) -> Result<Vec<HistoryRecord>> {
        let raw = self.get_json(HISTORY_ENDPOINT, &range.query_pairs())?;
        serde_json::from_value(raw).map_err(DashError::Json)
    }

    fn export_csv(
        &mut self,
        range: &HistoryRange,
        variables: Option<&[String]>,
    ) -> Result<Vec<u8>> {
        let mut query = range.query_pairs();
        if let Some(vars) = variables {
            if !vars.is_empty() {
                query.push(("variables", vars.join(",")));
            }
        }
        let response = self.get(EXPORT_ENDPOINT, &query)?;
        let bytes = self
            .runtime
            .block_on(response.bytes())
            .map_err(DashError::Http)?;
        Ok(bytes.to_vec())
    }

    fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }
}
