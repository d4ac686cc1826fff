use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::Error;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// This tool enforces no timeout of its own beyond the HTTP client's.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// The wire request: model, ordered messages, and sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

/// Only the choice list matters here; each choice is kept as raw JSON so the
/// json output mode can reproduce it in full.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Value>,
}

/// The prompt and optional system message for a single invocation.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system_message: Option<String>,
}

/// Seam over the hosted completion API. One HTTP implementation in
/// production; tests substitute stubs.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, api_key: &str, request: &ChatRequest) -> Result<ChatResponse, Error>;
}

pub struct OpenAiBackend {
    api_url: String,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new() -> Self {
        Self::with_url(DEFAULT_API_URL.to_string())
    }

    pub fn with_url(api_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { api_url, client }
    }
}

impl Default for OpenAiBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, api_key: &str, request: &ChatRequest) -> Result<ChatResponse, Error> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(Error::Upstream(format!("API error ({}): {}", status, body)));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| Error::Upstream(format!("unexpected response shape: {}", e)))
    }
}

/// Builds the ordered message list. The system message always comes first;
/// models are sensitive to message order.
pub fn build_messages(request: &CompletionRequest) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &request.system_message {
        messages.push(Message {
            role: "system".to_string(),
            content: system.clone(),
        });
    }
    messages.push(Message {
        role: "user".to_string(),
        content: request.prompt.clone(),
    });
    messages
}

/// Issues exactly one completion request and extracts the result.
///
/// Returns the first choice's message text, or the entire first choice
/// serialized to JSON when `json_mode` is set. Exactly one of the two
/// extraction paths runs per call.
pub async fn invoke(
    backend: &dyn CompletionBackend,
    config: &Config,
    request: &CompletionRequest,
    json_mode: bool,
) -> Result<String, Error> {
    // The resolver already enforces this, but the invoker must never reach
    // the network without a credential.
    if config.api_key.is_empty() {
        return Err(Error::MissingApiKey);
    }

    let chat_request = ChatRequest {
        model: config.model.clone(),
        messages: build_messages(request),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        top_p: config.top_p,
    };

    let response = backend.complete(&config.api_key, &chat_request).await?;
    let choice = response.choices.first().ok_or(Error::EmptyResponse)?;

    if json_mode {
        serde_json::to_string_pretty(choice)
            .map_err(|e| Error::Upstream(format!("could not serialize choice: {}", e)))
    } else {
        Ok(choice
            .pointer("/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct StubBackend {
        choices: Vec<Value>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl StubBackend {
        fn returning(choices: Vec<Value>) -> Self {
            Self {
                choices,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionBackend for StubBackend {
        async fn complete(
            &self,
            _api_key: &str,
            request: &ChatRequest,
        ) -> Result<ChatResponse, Error> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(ChatResponse {
                choices: self.choices.clone(),
            })
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl CompletionBackend for FailingBackend {
        async fn complete(
            &self,
            _api_key: &str,
            _request: &ChatRequest,
        ) -> Result<ChatResponse, Error> {
            Err(Error::Upstream("connection refused".to_string()))
        }
    }

    fn test_config() -> Config {
        Config {
            api_key: "k".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 100,
            temperature: 0.0,
            top_p: 1.0,
        }
    }

    fn choice(content: &str) -> Value {
        json!({
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        })
    }

    fn user_request(prompt: &str) -> CompletionRequest {
        CompletionRequest {
            prompt: prompt.to_string(),
            system_message: None,
        }
    }

    #[test]
    fn message_order_with_system_message() {
        let request = CompletionRequest {
            prompt: "Explain X".to_string(),
            system_message: Some("Be terse.".to_string()),
        };
        let messages = build_messages(&request);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, "Be terse.");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "Explain X");
    }

    #[test]
    fn single_user_message_without_system_message() {
        let messages = build_messages(&user_request("Explain X"));

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
    }

    #[tokio::test]
    async fn returns_first_choice_text() {
        let backend = StubBackend::returning(vec![choice("Hi there"), choice("second")]);
        let result = invoke(&backend, &test_config(), &user_request("Hello"), false)
            .await
            .unwrap();

        assert_eq!(result, "Hi there");
    }

    #[tokio::test]
    async fn json_mode_serializes_the_whole_first_choice() {
        let first = choice("Hi there");
        let backend = StubBackend::returning(vec![first.clone()]);
        let result = invoke(&backend, &test_config(), &user_request("Hello"), true)
            .await
            .unwrap();

        let parsed: Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed, first);
    }

    #[tokio::test]
    async fn text_mode_never_leaks_choice_structure() {
        let backend = StubBackend::returning(vec![choice("Hi there")]);
        let result = invoke(&backend, &test_config(), &user_request("Hello"), false)
            .await
            .unwrap();

        assert!(!result.contains("finish_reason"));
    }

    #[tokio::test]
    async fn empty_choice_list_is_reported() {
        let backend = StubBackend::returning(vec![]);
        let result = invoke(&backend, &test_config(), &user_request("Hello"), false).await;

        assert!(matches!(result, Err(Error::EmptyResponse)));
    }

    #[tokio::test]
    async fn missing_credential_never_reaches_the_backend() {
        let backend = StubBackend::returning(vec![choice("unreachable")]);
        let config = Config {
            api_key: String::new(),
            ..test_config()
        };
        let result = invoke(&backend, &config, &user_request("Hello"), false).await;

        assert!(matches!(result, Err(Error::MissingApiKey)));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_carries_the_underlying_message() {
        let result = invoke(
            &FailingBackend,
            &test_config(),
            &user_request("Hello"),
            false,
        )
        .await;

        match result {
            Err(Error::Upstream(msg)) => assert!(msg.contains("connection refused")),
            other => panic!("expected upstream failure, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn request_carries_resolved_parameters() {
        let backend = StubBackend::returning(vec![choice("ok")]);
        invoke(&backend, &test_config(), &user_request("Hello"), false)
            .await
            .unwrap();

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gpt-3.5-turbo");
        assert_eq!(requests[0].max_tokens, 100);
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].top_p, 1.0);
    }

    #[tokio::test]
    async fn identical_invocations_are_idempotent() {
        let backend = StubBackend::returning(vec![choice("Hi there")]);
        let config = test_config();
        let request = user_request("Hello");

        let first = invoke(&backend, &config, &request, false).await.unwrap();
        let second = invoke(&backend, &config, &request, false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.requests()[0], backend.requests()[1]);
    }

    #[test]
    fn request_serializes_with_expected_field_names() {
        let request = ChatRequest {
            model: "gpt-4o".to_string(),
            messages: build_messages(&user_request("hi")),
            max_tokens: 10,
            temperature: 0.0,
            top_p: 1.0,
        };
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 10);
        assert_eq!(body["messages"][0]["role"], "user");
    }
}
