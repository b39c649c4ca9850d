//! Hosted backend-as-a-service client: auth endpoints, REST tables, and
//! local session persistence.
//!
//! DESIGN
//! ======
//! One `BackendClient` is built from config at startup and shared via `Arc`.
//! Every request carries the project `apikey`; the bearer token is the
//! signed-in user's access token when there is one, otherwise the anon key.
//!
//! ERROR HANDLING
//! ==============
//! Transport problems, non-2xx responses and undecodable bodies are kept
//! apart in [`BackendError`]. The auth layer flattens them into the single
//! `AuthError` kind at the `AuthService` seam.

pub mod auth;
pub mod rest;
pub mod store;

use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::config::BackendConfig;
pub use rest::{Query, Rest};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by backend calls.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The HTTP request could not be sent or its body not read.
    #[error("request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}: {message}")]
    Response { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The operation needs a signed-in user.
    #[error("not signed in")]
    NoSession,

    /// A row the operation depends on does not exist or is not visible.
    #[error("not found: {0}")]
    NotFound(String),

    /// Input was rejected before any request was made.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The local session store could not be read or written.
    #[error("session store failed: {0}")]
    Store(String),
}

impl BackendError {
    /// Build a `Response` error, pulling a readable message out of the body.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        Self::Response { status, message: error_message(body) }
    }
}

/// Auth and REST endpoints both report errors as JSON, under one of a few keys.
pub(crate) fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
        .map_or_else(|| body.trim().to_string(), str::to_string)
}

// =============================================================================
// CLIENT
// =============================================================================

/// HTTP client bound to one backend project.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl BackendClient {
    /// Build a client from typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| BackendError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.url.clone(), anon_key: config.anon_key.clone() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn auth_endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    pub(crate) fn rest_endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    pub(crate) fn request(&self, method: Method, url: &str, token: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or(&self.anon_key))
    }

    /// REST scope authorized as `token`, or anonymously when `None`.
    #[must_use]
    pub fn rest<'a>(&'a self, token: Option<&'a str>) -> Rest<'a> {
        Rest::new(self, token)
    }
}

/// Send a request and return the status with the raw body.
pub(crate) async fn send(builder: RequestBuilder) -> Result<(u16, String), BackendError> {
    let response = builder
        .send()
        .await
        .map_err(|e| BackendError::Request(e.to_string()))?;
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| BackendError::Request(e.to_string()))?;
    Ok((status, text))
}

/// Send a request, require a 2xx status, and decode the JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, BackendError> {
    let (status, text) = send(builder).await?;
    if !(200..300).contains(&status) {
        return Err(BackendError::from_response(status, &text));
    }
    serde_json::from_str(&text).map_err(|e| BackendError::Parse(e.to_string()))
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
