//! `LlmClient` and its two implementations (§5). `HttpLlmClient` mirrors
//! the teacher's `AbortFetch`/timeout pattern for cancellable fetches,
//! substituting a `tokio_util::sync::CancellationToken` for the teacher's
//! `AbortSignal` and a hard `tokio::time::timeout` deadline for §5's
//! "bounded by time and body size".

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::LlmError;
use crate::protocol::{SemanticEnvelope, SemanticPatchRequest, SemanticPatchResponse};

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn request_patch(
        &self,
        request: &SemanticPatchRequest,
        cancel: &CancellationToken,
    ) -> Result<SemanticPatchResponse, LlmError>;
}

pub struct HttpLlmClient {
    client: reqwest::Client,
    endpoint: Url,
    deadline: Duration,
    model: Option<String>,
}

impl HttpLlmClient {
    pub fn new(endpoint: Url, deadline: Duration, model: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), endpoint, deadline, model }
    }
}

#[derive(serde::Serialize)]
struct RequestBody<'a> {
    request: &'a SemanticPatchRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn request_patch(
        &self,
        request: &SemanticPatchRequest,
        cancel: &CancellationToken,
    ) -> Result<SemanticPatchResponse, LlmError> {
        let send = self
            .client
            .post(self.endpoint.clone())
            .json(&RequestBody { request, model: self.model.as_deref() })
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(LlmError::Cancelled),
            result = tokio::time::timeout(self.deadline, send) => {
                result.map_err(|_elapsed| LlmError::Timeout)?.map_err(LlmError::Network)?
            }
        };

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "semantic patch endpoint returned non-2xx");
            return Err(LlmError::BadResponse(format!("http status {}", response.status())));
        }

        let envelope: SemanticEnvelope = tokio::select! {
            _ = cancel.cancelled() => return Err(LlmError::Cancelled),
            result = response.json() => result.map_err(LlmError::Network)?,
        };

        if !envelope.ok {
            return Err(LlmError::BadResponse(
                envelope.meta.reason.unwrap_or_else(|| "endpoint reported ok=false".to_string()),
            ));
        }

        envelope
            .response
            .ok_or_else(|| LlmError::BadResponse("ok=true but response missing".to_string()))
    }
}

/// Used when `FLOWBRIDGE_LLM_MOCK=1` (§6): a deterministic canned response
/// with no renames and no patches, so offline runs and integration tests
/// never touch the network.
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn request_patch(
        &self,
        _request: &SemanticPatchRequest,
        _cancel: &CancellationToken,
    ) -> Result<SemanticPatchResponse, LlmError> {
        Ok(SemanticPatchResponse::default())
    }
}
