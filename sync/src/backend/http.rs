//! HTTP client for a hosted document store.
//!
//! Documents live at `{base_url}/users/{id}`:
//! - `GET` returns the JSON document, or `404` when the user has none yet
//! - `PATCH` merges the JSON body into the document, creating it if needed
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use serene_sync::backend::{HttpRemoteStore, RemoteStore};
//!
//! let store = HttpRemoteStore::new("https://docs.example.com/v1", None, Duration::from_secs(10))?;
//! let document = store.get("user-123").await?;
//! ```

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use tracing::{debug, error};

use super::{RemoteDocument, RemoteStore};
use crate::config::RemoteConfig;
use crate::error::StoreError;

/// Remote store speaking JSON over HTTP.
///
/// The internal `reqwest::Client` pools connections; clone freely.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    http_client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpRemoteStore {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Configuration`] if `base_url` is not an absolute
    /// URL that can hold a path, or if the HTTP client cannot be created.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let base_url = base_url.into();
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| StoreError::Configuration(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Configuration(format!(
                "base URL '{base_url}' cannot hold a path"
            )));
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url,
            token,
        })
    }

    /// Creates a client from environment configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Configuration`] if the HTTP client cannot be created.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, StoreError> {
        Self::new(config.base_url.clone(), config.token.clone(), config.timeout)
    }

    fn document_url(&self, id: &str) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base URL always has path segments.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("users").push(id);
        }
        url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl RemoteStore for HttpRemoteStore {
    async fn get(&self, id: &str) -> Result<Option<RemoteDocument>, StoreError> {
        let url = self.document_url(id);
        debug!(url = %url, "Fetching remote document");

        let response = self.authorize(self.http_client.get(url)).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!("No remote document yet");
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "Unexpected response fetching remote document");
            return Err(StoreError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = response.bytes().await?;
        let document = serde_json::from_slice(&bytes)?;
        Ok(Some(document))
    }

    async fn put(&self, id: &str, document: &RemoteDocument) -> Result<(), StoreError> {
        let url = self.document_url(id);
        debug!(url = %url, "Merging remote document");

        let response = self
            .authorize(self.http_client.patch(url))
            .json(document)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "Unexpected response writing remote document");
            return Err(StoreError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(())
    }
}
