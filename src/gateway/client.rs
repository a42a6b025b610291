//! HTTP gateway client
//!
//! Talks to an OpenAI-compatible chat-completion gateway using reqwest:
//! - `POST /chat/completions` for completions
//! - `GET /models` for the model list
//! - Bearer authentication and default headers
//! - Retry with exponential backoff on configured status codes

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    ChatBackend, Completion, CompletionRequest, GatewayConfig, GatewayError, TokenUsage,
};

#[derive(Debug)]
pub struct GatewayClient {
    config: GatewayConfig,
    api_key: String,
    client: reqwest::Client,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig, api_key: String) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout))
            .build()
            .map_err(|e| GatewayError::Startup(e.to_string()))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    /// Build a client, taking the key from `api_key` or the configuration
    pub fn from_config(
        config: &GatewayConfig,
        api_key: Option<String>,
    ) -> Result<Self, GatewayError> {
        let key = api_key
            .filter(|k| !k.is_empty())
            .or_else(|| config.resolve_api_key())
            .ok_or_else(|| GatewayError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config.clone(), key)
    }

    fn build_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    fn should_retry(&self, status: u16, attempt: u32) -> bool {
        match &self.config.retry {
            Some(retry) => attempt + 1 < retry.max_attempts && retry.retry_on_status.contains(&status),
            None => false,
        }
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        match &self.config.retry {
            Some(retry) => {
                let delay = retry
                    .initial_delay
                    .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
                Duration::from_millis(delay.min(retry.max_delay))
            }
            None => Duration::from_millis(1000),
        }
    }

    async fn send_with_retry(&self, method: &str, path: &str, body: Option<&Value>) -> Result<Value, GatewayError> {
        let url = self.build_url(path);
        let max_attempts = self
            .config
            .retry
            .as_ref()
            .map(|r| r.max_attempts.max(1))
            .unwrap_or(1);

        let mut last_error = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = self.retry_delay(attempt);
                warn!(
                    "Retrying gateway request (attempt {}/{}) after {:?}",
                    attempt + 1,
                    max_attempts,
                    delay
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = match method {
                "GET" => self.client.get(&url),
                _ => self.client.post(&url),
            };
            request = request.bearer_auth(&self.api_key);
            for (key, value) in &self.config.headers {
                request = request.header(key, value);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!("Executing {} {}", method, url);
            let start = std::time::Instant::now();

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let text = response
                        .text()
                        .await
                        .map_err(|e| GatewayError::Request(e.to_string()))?;

                    info!(
                        "{} {} -> {} ({}ms)",
                        method,
                        url,
                        status,
                        start.elapsed().as_millis()
                    );

                    if (200..300).contains(&status) {
                        return serde_json::from_str(&text)
                            .map_err(|e| GatewayError::InvalidResponse(e.to_string()));
                    }

                    let error = GatewayError::Http {
                        status,
                        message: error_message(&text),
                    };
                    if self.should_retry(status, attempt) {
                        last_error = Some(error);
                        continue;
                    }
                    return Err(error);
                }
                Err(e) => {
                    warn!("Gateway request failed: {}", e);
                    let retryable = e.is_connect() || e.is_timeout();
                    last_error = Some(GatewayError::Request(e.to_string()));
                    if retryable {
                        continue;
                    }
                    break;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| GatewayError::Request("Request failed".to_string())))
    }

    /// List model identifiers the gateway offers
    pub async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
        let body = self.send_with_retry("GET", "models", None).await?;
        parse_models(&body)
    }
}

#[async_trait]
impl ChatBackend for GatewayClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, GatewayError> {
        let body = completion_body(&request);
        let response = self.send_with_retry("POST", "chat/completions", Some(&body)).await?;
        parse_completion(&response, &request.model)
    }
}

/// Request body for `POST /chat/completions`
pub fn completion_body(request: &CompletionRequest) -> Value {
    json!({
        "model": request.model,
        "messages": [{"role": "user", "content": request.prompt}],
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
        "stream": false,
    })
}

/// Extract message text and usage from a completion response
pub fn parse_completion(body: &Value, requested_model: &str) -> Result<Completion, GatewayError> {
    let content = body
        .pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| GatewayError::InvalidResponse("response has no message content".to_string()))?;

    let usage = body
        .get("usage")
        .cloned()
        .map(serde_json::from_value::<TokenUsage>)
        .transpose()
        .map_err(|e| GatewayError::InvalidResponse(format!("invalid usage block: {}", e)))?
        .unwrap_or_default();

    let model = body
        .get("model")
        .and_then(|m| m.as_str())
        .unwrap_or(requested_model)
        .to_string();

    Ok(Completion {
        model,
        content: content.to_string(),
        usage,
    })
}

fn parse_models(body: &Value) -> Result<Vec<String>, GatewayError> {
    let data = body
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| GatewayError::InvalidResponse("response has no model list".to_string()))?;

    let mut models: Vec<String> = data
        .iter()
        .filter_map(|m| m.get("id").and_then(|id| id.as_str()).map(String::from))
        .collect();
    models.sort();
    Ok(models)
}

/// Pull a readable message out of an error body
fn error_message(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error"))
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str().map(String::from))
        })
        .unwrap_or_else(|| text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::RetryConfig;

    fn client_with_retry(retry: Option<RetryConfig>) -> GatewayClient {
        let config = GatewayConfig {
            base_url: "http://localhost:9/v1/".to_string(),
            retry,
            ..Default::default()
        };
        GatewayClient::new(config, "test-key".to_string()).unwrap()
    }

    #[test]
    fn test_build_url() {
        let client = client_with_retry(None);
        assert_eq!(
            client.build_url("/chat/completions"),
            "http://localhost:9/v1/chat/completions"
        );
    }

    #[test]
    fn test_retry_policy() {
        let client = client_with_retry(Some(RetryConfig::default()));
        assert!(client.should_retry(429, 0));
        assert!(client.should_retry(503, 1));
        assert!(!client.should_retry(503, 2));
        assert!(!client.should_retry(400, 0));

        assert_eq!(client.retry_delay(1), Duration::from_millis(1000));
        assert_eq!(client.retry_delay(2), Duration::from_millis(2000));
        assert_eq!(client.retry_delay(10), Duration::from_millis(10000));

        let no_retry = client_with_retry(None);
        assert!(!no_retry.should_retry(503, 0));
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = GatewayConfig {
            api_key_env: "GATEWAY_AGENTS_TEST_UNSET_KEY".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            GatewayClient::from_config(&config, None),
            Err(GatewayError::MissingApiKey(_))
        ));
        assert!(GatewayClient::from_config(&config, Some("sk-1".to_string())).is_ok());
    }

    #[test]
    fn test_completion_body() {
        let body = completion_body(&CompletionRequest {
            model: "gpt-4o-mini".to_string(),
            prompt: "hi".to_string(),
            temperature: 0.5,
            max_tokens: 64,
        });
        assert_eq!(body["messages"][0]["content"], "hi");
        assert_eq!(body["max_tokens"], 64);
    }

    #[test]
    fn test_parse_completion() {
        let body = json!({
            "model": "gpt-4o-mini-2024",
            "choices": [{"message": {"role": "assistant", "content": "hello"}}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
        });
        let completion = parse_completion(&body, "gpt-4o-mini").unwrap();
        assert_eq!(completion.content, "hello");
        assert_eq!(completion.model, "gpt-4o-mini-2024");
        assert_eq!(completion.usage.total_tokens, 5);
        assert_eq!(completion.usage.cost, None);
    }

    #[test]
    fn test_parse_completion_without_content() {
        let body = json!({"choices": []});
        assert!(matches!(
            parse_completion(&body, "m"),
            Err(GatewayError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_models_and_errors() {
        let body = json!({"data": [{"id": "b"}, {"id": "a"}]});
        assert_eq!(parse_models(&body).unwrap(), vec!["a", "b"]);

        assert_eq!(
            error_message(r#"{"error": {"message": "invalid key"}}"#),
            "invalid key"
        );
        assert_eq!(error_message("plain failure\n"), "plain failure");
    }
}
