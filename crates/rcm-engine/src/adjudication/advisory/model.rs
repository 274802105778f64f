use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::prompt::{build_prompt, parse_suggestions};
use super::throttle::CallThrottle;
use super::{AdvisoryContext, AdvisoryTier, TierOutcome};
use crate::adjudication::domain::Claim;
use crate::config::AdvisoryConfig;

/// Failure modes of a single text-generation request.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("remote quota exhausted")]
    RateLimited,
    #[error("remote returned status {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unreadable response: {0}")]
    Decode(String),
}

/// One-shot text generation against an external model.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, TransportError>;
}

/// Google Generative Language `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiTransport {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl GeminiTransport {
    pub fn new(config: &AdvisoryConfig, api_key: String) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| TransportError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl CompletionTransport for GeminiTransport {
    async fn complete(&self, prompt: &str) -> Result<String, TransportError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.temperature },
        });

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Transport(err.to_string())
                }
            })?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(TransportError::RateLimited),
            status if !status.is_success() => return Err(TransportError::Status(status.as_u16())),
            _ => {}
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| TransportError::Decode(err.to_string()))?;

        candidate_text(&payload)
            .ok_or_else(|| TransportError::Decode("response carried no candidate text".to_string()))
    }
}

fn candidate_text(payload: &Value) -> Option<String> {
    let parts = payload
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// First rung of the ladder: ask the external model, subject to the throttle.
pub struct ModelTier {
    transport: Arc<dyn CompletionTransport>,
    throttle: Arc<CallThrottle>,
    timeout: Duration,
}

impl ModelTier {
    pub fn new(
        transport: Arc<dyn CompletionTransport>,
        throttle: Arc<CallThrottle>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            throttle,
            timeout,
        }
    }
}

#[async_trait]
impl AdvisoryTier for ModelTier {
    fn name(&self) -> &'static str {
        "model"
    }

    async fn advise(&self, claim: &Claim, context: &AdvisoryContext) -> TierOutcome {
        if !self.throttle.try_acquire() {
            debug!(claim_id = %claim.claim_id, "advisory model throttled");
            return TierOutcome::Empty;
        }

        let prompt = build_prompt(claim, context);
        let reply = match tokio::time::timeout(self.timeout, self.transport.complete(&prompt)).await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        };

        match reply {
            Ok(text) => {
                let findings = parse_suggestions(&text);
                if findings.is_empty() {
                    debug!(claim_id = %claim.claim_id, "advisory model reply had no usable entries");
                }
                TierOutcome::from(findings)
            }
            Err(TransportError::RateLimited) => {
                self.throttle.back_off();
                warn!(
                    claim_id = %claim.claim_id,
                    backoff_secs = self.throttle.remaining().as_secs(),
                    "advisory model rate limited; backing off"
                );
                TierOutcome::Empty
            }
            Err(err) => {
                warn!(claim_id = %claim.claim_id, %err, "advisory model call failed");
                TierOutcome::Empty
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_text_joins_parts() {
        let payload = json!({
            "candidates": [{ "content": { "parts": [{ "text": "[{\"explanation\":" }, { "text": "\"x\"}]" }] } }]
        });
        assert_eq!(
            candidate_text(&payload).as_deref(),
            Some("[{\"explanation\":\"x\"}]")
        );
        assert_eq!(candidate_text(&json!({ "candidates": [] })), None);
    }
}
