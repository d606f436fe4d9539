use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{self, DecodeError, Product, ProductId, ProductPayload};

pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred.";

/// The remote product resource. Implemented over HTTP by [`HttpGateway`];
/// tests swap in an in-memory store.
pub trait Gateway {
    fn list(&self) -> impl Future<Output = Result<Vec<Product>, GatewayError>> + Send;

    fn create(
        &self,
        payload: &ProductPayload,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    fn update(
        &self,
        id: &ProductId,
        payload: &ProductPayload,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    fn delete(&self, id: &ProductId) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid base URL: {url}")]
    InvalidBaseUrl { url: String },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with status {status}")]
    Status {
        url: String,
        status: u16,
        message: Option<String>,
    },

    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: DecodeError,
    },
}

impl GatewayError {
    /// What the user gets to see: the server's own message when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Status {
                message: Some(message),
                ..
            } => message.clone(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Trims whitespace and every trailing slash.
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Pulls a non-empty `message` field out of a JSON error body.
pub fn extract_error_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    parsed.message.filter(|m| !m.trim().is_empty())
}

#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self, GatewayError> {
        let base_url = normalize_base_url(base_url);
        match reqwest::Url::parse(&base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(GatewayError::InvalidBaseUrl { url: base_url }),
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|source| GatewayError::HttpClientBuild { source })?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/product", self.base_url)
    }

    /// The id goes in as a single percent-encoded path segment.
    fn record_url(&self, id: &ProductId) -> Result<reqwest::Url, GatewayError> {
        let invalid = || GatewayError::InvalidBaseUrl {
            url: self.base_url.clone(),
        };
        let mut url = reqwest::Url::parse(&self.collection_url()).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .push(&id.to_string());
        Ok(url)
    }

    async fn send(
        &self,
        url: String,
        req: reqwest::RequestBuilder,
    ) -> Result<Vec<u8>, GatewayError> {
        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(source) => {
                warn!(url = %url, error = %source, "request failed");
                return Err(GatewayError::Transport { url, source });
            }
        };
        let status = resp.status();
        let body = match resp.bytes().await {
            Ok(body) => body.to_vec(),
            Err(source) => return Err(GatewayError::Transport { url, source }),
        };
        debug!(url = %url, status = status.as_u16(), bytes = body.len(), "response");
        if !status.is_success() {
            let message = extract_error_message(&body);
            warn!(url = %url, status = status.as_u16(), message = ?message, "request rejected");
            return Err(GatewayError::Status {
                url,
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }
}

impl Gateway for HttpGateway {
    async fn list(&self) -> Result<Vec<Product>, GatewayError> {
        let url = self.collection_url();
        debug!(url = %url, "GET");
        let body = self.send(url.clone(), self.client.get(&url)).await?;
        model::decode_collection(&body).map_err(|source| {
            warn!(url = %url, error = %source, "discarding undecodable product list");
            GatewayError::Decode { url, source }
        })
    }

    async fn create(&self, payload: &ProductPayload) -> Result<(), GatewayError> {
        let url = self.collection_url();
        debug!(url = %url, "POST");
        self.send(url.clone(), self.client.post(&url).json(payload))
            .await
            .map(|_| ())
    }

    async fn update(&self, id: &ProductId, payload: &ProductPayload) -> Result<(), GatewayError> {
        let url = self.record_url(id)?;
        debug!(url = %url, "PATCH");
        self.send(url.to_string(), self.client.patch(url).json(payload))
            .await
            .map(|_| ())
    }

    async fn delete(&self, id: &ProductId) -> Result<(), GatewayError> {
        let url = self.record_url(id)?;
        debug!(url = %url, "DELETE");
        self.send(url.to_string(), self.client.delete(url))
            .await
            .map(|_| ())
    }
}
