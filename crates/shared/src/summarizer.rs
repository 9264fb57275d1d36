use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{SummarizerBackend, SummarizerConfig};
use crate::error::{CallError, SummarizeError};
use crate::local_summarizer::LocalSummarizer;
use crate::retry::RetryPolicy;
use crate::text::{chunk_chars, shorten, truncate_chars};

/// Width of the stand-in summary used when the service declines a request.
const DECLINED_FALLBACK_WIDTH: usize = 400;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Summary {
    Success(String),
    /// No summary could be produced. Callers should fall back to the source text.
    Unavailable,
}

impl Summary {
    /// The summary text, if there is any worth showing.
    pub fn usable_text(&self) -> Option<&str> {
        match self {
            Summary::Success(text) if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        }
    }
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<Summary, SummarizeError>;

    fn name(&self) -> &'static str;
}

/// Build the summarizer selected by the configuration.
pub fn from_config(config: &SummarizerConfig) -> Result<Box<dyn Summarizer>, SummarizeError> {
    match config.backend {
        SummarizerBackend::Remote => Ok(Box::new(RemoteSummarizer::new(config)?)),
        SummarizerBackend::Local => Ok(Box::new(LocalSummarizer::default())),
    }
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    min_length: u32,
}

/// Summarizes through a hosted inference endpoint.
///
/// Short inputs are summarized in one call. Longer inputs are cut into fixed-size
/// chunks, each chunk is summarized on its own, and the joined partial summaries are
/// summarized once more. Chunks that fail contribute nothing; if every chunk fails
/// the result is [`Summary::Unavailable`].
pub struct RemoteSummarizer {
    client: Client,
    api_url: String,
    api_token: Option<String>,
    chunk_chars: usize,
    max_new_tokens: u32,
    min_length: u32,
    retry: RetryPolicy,
}

impl RemoteSummarizer {
    pub fn new(config: &SummarizerConfig) -> Result<Self, SummarizeError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SummarizeError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_token: config.api_token.clone(),
            chunk_chars: config.chunk_chars.max(1),
            max_new_tokens: config.max_new_tokens,
            min_length: config.min_length,
            retry: config.retry,
        })
    }

    async fn summarize_direct(&self, text: &str) -> Summary {
        match self.call(text).await {
            Ok(summary) => Summary::Success(summary),
            Err(e) => {
                tracing::warn!(error = %e, "summarization failed, summary unavailable");
                Summary::Unavailable
            }
        }
    }

    async fn summarize_chunked(&self, text: &str) -> Summary {
        let chunks = chunk_chars(text, self.chunk_chars);
        let total = chunks.len();
        let mut partials = Vec::with_capacity(total);

        for (index, chunk) in chunks.into_iter().enumerate() {
            match self.call(chunk).await {
                Ok(partial) if !partial.trim().is_empty() => partials.push(partial),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(chunk = index + 1, total, error = %e, "partial summarization failed");
                }
            }
        }

        let merged = partials.join("\n");
        if merged.is_empty() {
            tracing::warn!(total, "every chunk failed, summary unavailable");
            return Summary::Unavailable;
        }

        self.summarize_direct(&merged).await
    }

    /// One summarization request with retries.
    ///
    /// An explicit error payload from the service is not retried; a shortened copy of
    /// the input stands in for the summary instead.
    async fn call(&self, text: &str) -> Result<String, CallError> {
        match self
            .retry
            .run("summarization request", || self.call_once(text))
            .await
        {
            Err(CallError::Service(message)) => {
                tracing::warn!(error = %message, "summarization service declined request");
                Ok(shorten(text, DECLINED_FALLBACK_WIDTH))
            }
            other => other,
        }
    }

    async fn call_once(&self, text: &str) -> Result<String, CallError> {
        let payload = InferenceRequest {
            inputs: truncate_chars(text, self.chunk_chars),
            parameters: InferenceParameters {
                max_new_tokens: self.max_new_tokens,
                min_length: self.min_length,
            },
        };

        let mut request = self.client.post(&self.api_url).json(&payload);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(CallError::Transport(format!(
                "HTTP {}: {}",
                status,
                truncate_chars(&error_text, 200)
            )));
        }

        let body = response.json::<Value>().await?;
        Self::parse_response(body)
    }

    fn parse_response(body: Value) -> Result<String, CallError> {
        fn text_field<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
            obj.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
        }

        match body {
            Value::Array(items) => match items.first() {
                Some(Value::Object(obj)) => Ok(text_field(obj, "summary_text")
                    .or_else(|| text_field(obj, "generated_text"))
                    .unwrap_or("")
                    .trim()
                    .to_string()),
                _ => Err(CallError::Malformed(
                    "expected a list of summary objects".to_string(),
                )),
            },
            Value::Object(obj) => {
                match obj.get("error") {
                    Some(Value::String(message)) if !message.is_empty() => {
                        return Err(CallError::Service(message.clone()))
                    }
                    Some(Value::String(_)) | Some(Value::Null) | None => {}
                    Some(other) => return Err(CallError::Service(other.to_string())),
                }
                text_field(&obj, "summary_text")
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| CallError::Malformed(Value::Object(obj.clone()).to_string()))
            }
            other => Err(CallError::Malformed(other.to_string())),
        }
    }
}

#[async_trait]
impl Summarizer for RemoteSummarizer {
    async fn summarize(&self, text: &str) -> Result<Summary, SummarizeError> {
        if text.trim().is_empty() {
            return Ok(Summary::Success(String::new()));
        }

        if text.chars().count() <= self.chunk_chars {
            Ok(self.summarize_direct(text).await)
        } else {
            Ok(self.summarize_chunked(text).await)
        }
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, max_attempts: u32) -> SummarizerConfig {
        SummarizerConfig {
            backend: SummarizerBackend::Remote,
            api_url: format!("{}/models/test", server.uri()),
            api_token: Some("secret".to_string()),
            chunk_chars: 3000,
            max_new_tokens: 120,
            min_length: 30,
            retry: RetryPolicy::new(max_attempts, Duration::ZERO),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_from_config_selects_backend() {
        let mut config = SummarizerConfig {
            backend: SummarizerBackend::Local,
            api_url: "http://localhost/models/test".to_string(),
            api_token: None,
            chunk_chars: 3000,
            max_new_tokens: 120,
            min_length: 30,
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        };
        assert_eq!(from_config(&config).unwrap().name(), "local");

        config.backend = SummarizerBackend::Remote;
        assert_eq!(from_config(&config).unwrap().name(), "remote");
    }

    #[test]
    fn test_usable_text() {
        assert_eq!(Summary::Success("S".into()).usable_text(), Some("S"));
        assert_eq!(Summary::Success("  ".into()).usable_text(), None);
        assert_eq!(Summary::Unavailable.usable_text(), None);
    }

    #[test]
    fn test_parse_response_shapes() {
        assert_eq!(
            RemoteSummarizer::parse_response(json!([{"summary_text": "A"}])).unwrap(),
            "A"
        );
        assert_eq!(
            RemoteSummarizer::parse_response(json!([{"generated_text": "B"}])).unwrap(),
            "B"
        );
        assert_eq!(
            RemoteSummarizer::parse_response(json!({"summary_text": "C"})).unwrap(),
            "C"
        );
        assert!(matches!(
            RemoteSummarizer::parse_response(json!({"error": "Model is loading"})),
            Err(CallError::Service(_))
        ));
        assert!(matches!(
            RemoteSummarizer::parse_response(json!(42)),
            Err(CallError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"summary_text": "S"}])))
            .expect(0)
            .mount(&server)
            .await;

        let summarizer = RemoteSummarizer::new(&config_for(&server, 3)).unwrap();
        assert_eq!(
            summarizer.summarize("").await.unwrap(),
            Summary::Success(String::new())
        );
        assert_eq!(
            summarizer.summarize("  \n ").await.unwrap(),
            Summary::Success(String::new())
        );
    }

    #[tokio::test]
    async fn test_direct_call_sends_expected_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/test"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(json!({
                "inputs": "Some article text.",
                "parameters": {"max_new_tokens": 120, "min_length": 30}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"summary_text": "S"}])))
            .expect(1)
            .mount(&server)
            .await;

        let summarizer = RemoteSummarizer::new(&config_for(&server, 3)).unwrap();
        let summary = summarizer.summarize("Some article text.").await.unwrap();
        assert_eq!(summary, Summary::Success("S".to_string()));
    }

    #[tokio::test]
    async fn test_error_payload_is_not_retried_and_returns_truncated_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "Model busy"})))
            .expect(1)
            .mount(&server)
            .await;

        let text = "word ".repeat(200);
        let summarizer = RemoteSummarizer::new(&config_for(&server, 3)).unwrap();
        let summary = summarizer.summarize(&text).await.unwrap();

        let expected = shorten(&text, DECLINED_FALLBACK_WIDTH);
        assert_eq!(summary, Summary::Success(expected.clone()));
        assert!(expected.chars().count() <= DECLINED_FALLBACK_WIDTH);
        assert!(!expected.contains("error"));
    }

    #[tokio::test]
    async fn test_timeouts_exhaust_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"summary_text": "late"}]))
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(3)
            .mount(&server)
            .await;

        let mut config = config_for(&server, 3);
        config.request_timeout = Duration::from_millis(100);
        let summarizer = RemoteSummarizer::new(&config).unwrap();

        assert_eq!(
            summarizer.summarize("Some text").await.unwrap(),
            Summary::Unavailable
        );
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(3)
            .mount(&server)
            .await;

        let summarizer = RemoteSummarizer::new(&config_for(&server, 3)).unwrap();
        assert_eq!(
            summarizer.summarize("Some text").await.unwrap(),
            Summary::Unavailable
        );
    }

    #[tokio::test]
    async fn test_malformed_response_is_final() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(42)))
            .expect(1)
            .mount(&server)
            .await;

        let summarizer = RemoteSummarizer::new(&config_for(&server, 3)).unwrap();
        assert_eq!(
            summarizer.summarize("Some text").await.unwrap(),
            Summary::Unavailable
        );
    }

    #[tokio::test]
    async fn test_long_text_is_chunked_then_resummarized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"summary_text": "part"}])))
            .expect(4)
            .mount(&server)
            .await;

        let summarizer = RemoteSummarizer::new(&config_for(&server, 3)).unwrap();
        let summary = summarizer.summarize(&"a".repeat(7000)).await.unwrap();
        assert_eq!(summary, Summary::Success("part".to_string()));
    }

    #[tokio::test]
    async fn test_all_chunks_failing_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let summarizer = RemoteSummarizer::new(&config_for(&server, 1)).unwrap();
        let summary = summarizer.summarize(&"a".repeat(7000)).await.unwrap();
        assert_eq!(summary, Summary::Unavailable);
    }
}
