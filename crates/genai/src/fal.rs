//! Client for fal.ai hosted media models via the queue API.
//!
//! Every model call follows the same shape: submit the request to
//! `https://queue.fal.run/{model}`, poll the returned status URL until the
//! request completes, then fetch the response payload. This mirrors the
//! blocking `subscribe` helper of the official SDKs.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

/// Default queue host.
pub const DEFAULT_QUEUE_URL: &str = "https://queue.fal.run";

/// Interval between status polls.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Give up after this many polls (20 minutes at the 2s interval; hosted
/// video models can take several minutes per clip).
const MAX_POLLS: u32 = 600;

/// Errors from the fal queue layer.
#[derive(Debug, thiserror::Error)]
pub enum FalError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("fal API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The queued request did not complete within the polling budget.
    #[error("fal request for {model} timed out after {polls} polls")]
    Timeout { model: String, polls: u32 },

    /// The response body did not have the expected shape.
    #[error("unexpected fal response: {0}")]
    Parse(String),
}

/// Ticket returned when a request is enqueued.
#[derive(Debug, Deserialize)]
struct QueueTicket {
    status_url: String,
    response_url: String,
}

/// Status document returned by the status URL.
#[derive(Debug, Deserialize)]
struct QueueStatus {
    status: String,
}

/// HTTP client for the fal queue API.
#[derive(Clone)]
pub struct FalClient {
    client: reqwest::Client,
    queue_url: String,
    api_key: String,
}

impl FalClient {
    pub fn new(api_key: String) -> Self {
        Self::with_queue_url(api_key, DEFAULT_QUEUE_URL.to_string())
    }

    /// Create a client against a non-default queue host (used by tests).
    pub fn with_queue_url(api_key: String, queue_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            queue_url,
            api_key,
        }
    }

    /// Run a model to completion and return its response payload.
    ///
    /// `model` is the fal model path (e.g. `fal-ai/flux-pro/v1.1-ultra`),
    /// `arguments` the model-specific input object.
    pub async fn run(&self, model: &str, arguments: Value) -> Result<Value, FalError> {
        let ticket = self.submit(model, arguments).await?;

        for _ in 0..MAX_POLLS {
            let status = self.poll_status(&ticket.status_url).await?;
            if status == "COMPLETED" {
                return self.fetch_response(&ticket.response_url).await;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        Err(FalError::Timeout {
            model: model.to_string(),
            polls: MAX_POLLS,
        })
    }

    async fn submit(&self, model: &str, arguments: Value) -> Result<QueueTicket, FalError> {
        let url = format!("{}/{}", self.queue_url, model);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Key {}", self.api_key))
            .json(&arguments)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    async fn poll_status(&self, status_url: &str) -> Result<String, FalError> {
        let resp = self
            .client
            .get(status_url)
            .header("Authorization", format!("Key {}", self.api_key))
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let status: QueueStatus = resp.json().await?;
        Ok(status.status)
    }

    async fn fetch_response(&self, response_url: &str) -> Result<Value, FalError> {
        let resp = self
            .client
            .get(response_url)
            .header("Authorization", format!("Key {}", self.api_key))
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }
}

/// Extract a nested URL field from a model response, e.g.
/// `images[0].url`, `audio_url.url` or `video.url` depending on the model.
pub fn url_at<'a>(resp: &'a Value, path: &[&str]) -> Result<&'a str, FalError> {
    let mut node = resp;
    for key in path {
        node = match key.parse::<usize>() {
            Ok(idx) => &node[idx],
            Err(_) => &node[*key],
        };
    }
    node.as_str()
        .ok_or_else(|| FalError::Parse(format!("missing url at {}", path.join("."))))
}

/// Map a non-2xx response to [`FalError::Api`] with the raw body attached.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, FalError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(FalError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}
