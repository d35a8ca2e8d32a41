//! The default [`crate::collaborators::VisionModelClient`]: an HTTPS client over `reqwest` that
//! POSTs a base64-encoded screenshot and prompt, and retries on rate-limiting with exponential
//! backoff rather than failing the action outright.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::collaborators::{ModelResponse, VisionModelClient};
use crate::config::VisionConfig;
use crate::error::EngineError;

#[derive(Debug, Deserialize)]
struct VisionApiResponse {
    text: String,
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

pub struct ReqwestVisionClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_retries: u32,
}

impl ReqwestVisionClient {
    pub fn new(config: &VisionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            max_retries: config.max_retries,
        }
    }

    fn backoff_for(attempt: u32) -> std::time::Duration {
        std::time::Duration::from_millis(200u64 * 2u64.saturating_pow(attempt.saturating_sub(1)))
    }
}

#[async_trait]
impl VisionModelClient for ReqwestVisionClient {
    async fn send(
        &self,
        png_bytes: &[u8],
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<ModelResponse, EngineError> {
        let body = serde_json::json!({
            "model": self.model,
            "image": BASE64.encode(png_bytes),
            "prompt": prompt,
        });

        let mut attempt = 0u32;
        loop {
            let started = std::time::Instant::now();
            let request = self.client.post(&self.endpoint).json(&body).send();
            let response = tokio::select! {
                _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                result = request => result,
            };

            let resp = match response {
                Ok(resp) => resp,
                Err(err) => return Err(EngineError::ModelError(err.to_string())),
            };

            if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                attempt += 1;
                if attempt > self.max_retries {
                    return Err(EngineError::ModelError(
                        "vision model rate-limited past max retries".to_string(),
                    ));
                }
                let backoff = Self::backoff_for(attempt);
                tokio::select! {
                    _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                    _ = tokio::time::sleep(backoff) => {}
                }
                continue;
            }

            let status = resp.status();
            if !status.is_success() {
                return Err(EngineError::ModelError(format!("vision model returned HTTP {status}")));
            }

            let parsed: VisionApiResponse =
                resp.json().await.map_err(|err| EngineError::ModelError(err.to_string()))?;

            return Ok(ModelResponse {
                text: parsed.text,
                input_tokens: parsed.input_tokens,
                output_tokens: parsed.output_tokens,
                model: self.model.clone(),
                duration_ms: started.elapsed().as_millis() as u64,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(endpoint: String) -> VisionConfig {
        VisionConfig { endpoint, model: "test-model".to_string(), max_retries: 2 }
    }

    #[tokio::test]
    async fn successful_response_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "400,300",
                "input_tokens": 12,
                "output_tokens": 4,
            })))
            .mount(&server)
            .await;

        let client = ReqwestVisionClient::new(&config_for(server.uri()));
        let result = client.send(b"png", "locate", &CancellationToken::new()).await.unwrap();
        assert_eq!(result.text, "400,300");
        assert_eq!(result.input_tokens, 12);
        assert_eq!(result.output_tokens, 4);
    }

    #[tokio::test]
    async fn rate_limit_is_retried_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "MATCH",
                "input_tokens": 1,
                "output_tokens": 1,
            })))
            .mount(&server)
            .await;

        let client = ReqwestVisionClient::new(&config_for(server.uri()));
        let result = client.send(b"png", "expect", &CancellationToken::new()).await.unwrap();
        assert_eq!(result.text, "MATCH");
    }

    #[tokio::test]
    async fn rate_limit_past_max_retries_is_a_model_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = ReqwestVisionClient::new(&config_for(server.uri()));
        let err = client.send(b"png", "expect", &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::ModelError(_)));
    }
}
