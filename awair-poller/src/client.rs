use awair_core::Reading;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Why a single device poll failed. None of these are retried.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to create request: {0}")]
    BuildRequest(#[source] reqwest::Error),

    #[error("failed to get data from device: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("device answered with HTTP {0}")]
    UnexpectedStatus(StatusCode),

    #[error("failed to read response body: {0}")]
    ReadBody(#[source] reqwest::Error),

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl FetchError {
    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Client(_) => "client",
            FetchError::BuildRequest(_) => "build_request",
            FetchError::Transport(_) => "transport",
            FetchError::UnexpectedStatus(_) => "status",
            FetchError::ReadBody(_) => "read_body",
            FetchError::Decode(_) => "decode",
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            FetchError::Transport(e) | FetchError::ReadBody(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// HTTP client for the Awair Local API.
#[derive(Debug, Clone)]
pub struct SensorClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SensorClient {
    /// `timeout` bounds the whole exchange, body included.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("awair-exporter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// One GET against the device, decoded into a [`Reading`].
    pub async fn fetch(&self) -> Result<Reading, FetchError> {
        let request = self
            .http
            .get(&self.endpoint)
            .build()
            .map_err(FetchError::BuildRequest)?;

        let resp = self
            .http
            .execute(request)
            .await
            .map_err(FetchError::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus(status));
        }

        let body = resp.bytes().await.map_err(FetchError::ReadBody)?;
        Reading::from_slice(&body).map_err(FetchError::Decode)
    }
}
