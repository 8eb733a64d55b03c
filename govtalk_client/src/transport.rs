use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use url::Url;

/// Moves one serialized envelope to the gateway and brings back the raw
/// reply.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn exchange(&self, endpoint: &Url, request: &str) -> Result<String, Self::Error>;
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("cannot build http client")]
    CannotBuildClient,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("gateway answered {code}: {reason}")]
    Status { code: u16, reason: String },
}

/// POSTs envelopes as `text/xml`.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|_| TransportError::CannotBuildClient)?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    type Error = TransportError;

    async fn exchange(&self, endpoint: &Url, request: &str) -> Result<String, Self::Error> {
        let response = self
            .client
            .post(endpoint.clone())
            .header(CONTENT_TYPE, "text/xml")
            .body(request.to_owned())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_owned(),
            });
        }

        Ok(response.text().await?)
    }
}
