use async_trait::async_trait;
use reqwest::Client;
use shared::protocol::ContactRequest;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// What the endpoint answered, before any interpretation of the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Any 2xx status. The body is ignored.
    Accepted,
    Rejected { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// The cancellation token fired before a response arrived.
    #[error("contact request cancelled")]
    Cancelled,
    #[error("contact request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Failures from transports that do not speak HTTP.
    #[error("contact request failed: {0}")]
    Other(String),
}

#[async_trait]
pub trait ContactTransport: Send + Sync {
    /// Sends one submission. Implementations must return
    /// [`TransportError::Cancelled`] promptly once `cancel` fires.
    async fn post_contact(
        &self,
        request: &ContactRequest,
        cancel: CancellationToken,
    ) -> Result<SubmitOutcome, TransportError>;
}

#[derive(Clone)]
pub struct HttpContactTransport {
    http: Client,
    endpoint: Url,
}

impl HttpContactTransport {
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(http: Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ContactTransport for HttpContactTransport {
    async fn post_contact(
        &self,
        request: &ContactRequest,
        cancel: CancellationToken,
    ) -> Result<SubmitOutcome, TransportError> {
        debug!(endpoint = %self.endpoint, "posting contact submission");
        let send = self.http.post(self.endpoint.clone()).json(request).send();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            response = send => response?,
        };

        let status = response.status();
        if status.is_success() {
            return Ok(SubmitOutcome::Accepted);
        }

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            body = response.text() => body.unwrap_or_else(|error| {
                warn!(%error, %status, "failed to read contact rejection body");
                String::new()
            }),
        };
        Ok(SubmitOutcome::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
