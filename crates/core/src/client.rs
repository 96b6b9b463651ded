use crate::error::PipelineError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;
use url::Url;

/// How much of an unusable upstream body is kept for diagnostics.
pub const RAW_EXCERPT_CHARS: usize = 200;

/// Substituted when a successful upstream reply carries no answer text. An
/// empty answer is not an error.
pub const MISSING_ANSWER_FALLBACK: &str = "No response";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// The single synchronous contract toward the generation backend: one prompt
/// and model id in, one text block or one error out.
#[async_trait]
pub trait GenerationBackend {
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, PipelineError>;
}

/// Talks to the relay endpoint that fronts the interchangeable generation
/// backends. Streaming is not used.
pub struct GenerationClient {
    client: Client,
    endpoint: Url,
}

impl GenerationClient {
    pub fn new(endpoint: &str) -> Result<Self, PipelineError> {
        Self::with_timeout(endpoint, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self, PipelineError> {
        let endpoint = Url::parse(endpoint)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| PipelineError::Transport(error.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

/// Raw request/reply exchange toward the relay, split from reply
/// interpretation so the retry policy stays exercisable without a live
/// endpoint.
#[async_trait]
trait Transport {
    async fn exchange(&self, body: &Value) -> Result<(StatusCode, String), PipelineError>;
}

#[async_trait]
impl Transport for GenerationClient {
    async fn exchange(&self, body: &Value) -> Result<(StatusCode, String), PipelineError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(body)
            .send()
            .await
            .map_err(|error| PipelineError::Transport(error.to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|error| PipelineError::Transport(error.to_string()))?;
        Ok((status, raw))
    }
}

/// At most one retry, and only on a transport-level failure. Replies that
/// arrive, however broken their payload, are never reissued.
async fn issue_with_retry<T: Transport + Sync>(
    transport: &T,
    body: &Value,
) -> Result<(StatusCode, String), PipelineError> {
    match transport.exchange(body).await {
        Ok(reply) => Ok(reply),
        Err(PipelineError::Transport(first)) => {
            warn!(error = %first, "transport failure, retrying once");
            transport.exchange(body).await
        }
        Err(other) => Err(other),
    }
}

fn raw_excerpt(raw: &str) -> String {
    raw.chars().take(RAW_EXCERPT_CHARS).collect()
}

/// Interpret one upstream reply. The body is read as raw text first and
/// never assumed well-formed: an unparseable body outranks the status code,
/// a parseable error body surfaces the upstream message, and a successful
/// body without an answer field degrades to the literal fallback.
pub fn interpret_response(status: StatusCode, raw: &str) -> Result<String, PipelineError> {
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(_) => {
            return Err(PipelineError::UpstreamMalformed {
                excerpt: raw_excerpt(raw),
            })
        }
    };

    if !status.is_success() {
        let message = parsed
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| parsed.get("error").and_then(Value::as_str))
            .unwrap_or("upstream returned an error")
            .to_string();
        return Err(PipelineError::Upstream {
            status: status.as_u16(),
            message,
            excerpt: raw_excerpt(raw),
        });
    }

    let answer = parsed
        .get("response")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .unwrap_or(MISSING_ANSWER_FALLBACK);
    Ok(answer.to_string())
}

#[async_trait]
impl GenerationBackend for GenerationClient {
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, PipelineError> {
        let body = json!({ "model": model, "prompt": prompt });
        let (status, raw) = issue_with_retry(self, &body).await?;
        interpret_response(status, &raw)
    }
}
