//! The text-completion backend and its Groq implementation.

use std::fmt::Debug;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Errors from talking to the completion service or reading its output.
///
/// These are logged by [ExpenseAssistant](crate::ExpenseAssistant) and never
/// shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// The request could not be sent or the response body could not be read.
    #[error("request to the completion service failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-success status code.
    #[error("the completion service responded with {0}")]
    Status(StatusCode),

    /// The service answered without any message content.
    #[error("the completion service returned no content")]
    EmptyResponse,

    /// The completion was not valid JSON.
    #[error("could not parse the completion as JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The completion was JSON but not a JSON object.
    #[error("expected a JSON object but got {0}")]
    NotAnObject(String),

    /// The amount in the completion could not be read as a number.
    #[error("could not read {0:?} as an amount")]
    InvalidAmount(String),
}

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// The question being asked.
    User,
}

/// One message in a chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    /// Who wrote the message.
    pub role: Role,
    /// The message text.
    pub content: String,
}

impl ChatMessage {
    /// A system instruction.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// A message from the user.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A single-turn request for a text completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// The system instruction followed by the user's prompt.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature, lower is more predictable.
    pub temperature: f32,
    /// The longest completion wanted, or the service's default.
    pub max_tokens: Option<u32>,
}

/// Something that can turn a chat into a text completion.
#[async_trait]
pub trait CompletionBackend: Debug + Send + Sync {
    /// Send `request` and return the trimmed content of the first choice.
    async fn complete(&self, request: CompletionRequest) -> Result<String, AiError>;
}

/// Settings for the Groq chat completions API.
#[derive(Clone)]
pub struct GroqConfig {
    /// The bearer token sent with each request.
    pub api_key: String,
    /// The API root, e.g. "https://api.groq.com/openai/v1".
    pub base_url: String,
    /// The model name, e.g. "llama-3.3-70b-versatile".
    pub model: String,
}

impl GroqConfig {
    /// The public Groq endpoint for OpenAI compatible requests.
    pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
    /// The model used unless another is configured.
    pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

    /// Use `api_key` with the default endpoint and model.
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_owned(),
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            model: Self::DEFAULT_MODEL.to_owned(),
        }
    }
}

impl Debug for GroqConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Calls an OpenAI compatible chat completions endpoint, such as Groq's.
#[derive(Debug, Clone)]
pub struct GroqBackend {
    client: reqwest::Client,
    config: GroqConfig,
}

impl GroqBackend {
    /// Create a backend with its own HTTP client.
    pub fn new(config: GroqConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionBackend for GroqBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AiError> {
        let body = ChatCompletionBody {
            model: &self.config.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiError::Status(status));
        }

        let completion: ChatCompletionResponse = response.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_owned())
            .filter(|content| !content.is_empty())
            .ok_or(AiError::EmptyResponse)
    }
}
