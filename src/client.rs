//! HTTP client for the registry API.
//!
//! Mirrors the five registry operations one-to-one. Error responses are
//! decoded back into their status and error code so callers can tell an
//! `ALREADY_EXISTS` from a `NOT_FOUND` without parsing messages.

use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::api::{AppendRequest, AppendResponse, CreateRequest, CreateResponse, ErrorResponse};
use crate::registry::{ItemState, Snapshot};

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors returned by [`RegistryClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Registry returned {status} {code}: {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },
}

impl ClientError {
    /// Error code reported by the registry, if this is an API error.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }
}

/// Client for a running registry server.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    base: Url,
}

impl RegistryClient {
    /// Create a client for the server at `base_url`, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    pub async fn create(&self, id: &str, payload: &str) -> Result<CreateResponse> {
        let request = CreateRequest {
            id: id.to_string(),
            payload: payload.to_string(),
        };
        let response = self
            .http
            .post(self.url(&["v1", "products"])?)
            .json(&request)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn append(&self, id: &str, payload: &str) -> Result<()> {
        let request = AppendRequest {
            payload: payload.to_string(),
        };
        let response = self
            .http
            .post(self.item_url(id, Some("snapshots"))?)
            .json(&request)
            .send()
            .await?;
        let _: AppendResponse = decode(response).await?;
        Ok(())
    }

    pub async fn current(&self, id: &str) -> Result<ItemState> {
        let response = self
            .http
            .get(self.item_url(id, None)?)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn history(&self, id: &str) -> Result<Vec<Snapshot>> {
        let response = self
            .http
            .get(self.item_url(id, Some("history"))?)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn count(&self) -> Result<usize> {
        let response = self.http.get(self.url(&["v1", "count"])?).send().await?;
        decode(response).await
    }

    /// URL for one item, optionally followed by an action segment.
    ///
    /// URL parsing drops `.` and `..` path segments (percent-encoded or not),
    /// so those ids are sent through the query-string routes instead.
    fn item_url(&self, id: &str, action: Option<&str>) -> Result<Url> {
        if matches!(id, "." | "..") {
            let mut segments = vec!["v1", "item"];
            segments.extend(action);
            let mut url = self.url(&segments)?;
            url.query_pairs_mut().append_pair("id", id);
            return Ok(url);
        }

        let mut segments = vec!["v1", "products", id];
        segments.extend(action);
        self.url(&segments)
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await?;
    let (code, message) = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => (err.code, err.error),
        Err(_) => (status.as_str().to_string(), body),
    };
    Err(ClientError::Api {
        status,
        code,
        message,
    })
}
