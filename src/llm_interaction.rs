use std::fmt;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::constants;
use crate::error::LlmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Where to reach the OpenAI-compatible endpoint and which model to ask.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_base: String,
    pub model: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base: constants::GROQ_API_BASE.clone(),
            model: constants::DEFAULT_MODEL.clone(),
        }
    }
}

// Structures matching the /chat/completions endpoint
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    stream: bool, // We want the full response, not a stream
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize, Debug)]
struct ModelEntry {
    id: String,
}

/// Authenticated handle to the Groq API.
#[derive(Clone)]
pub struct GroqClient {
    http: Client,
    api_key: String,
    settings: ClientSettings,
}

// Manual Debug so the API key never ends up in logs.
impl fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroqClient")
            .field("api_base", &self.settings.api_base)
            .field("model", &self.settings.model)
            .finish_non_exhaustive()
    }
}

impl GroqClient {
    pub fn new(api_key: impl Into<String>, settings: ClientSettings) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            settings,
        }
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.api_base.trim_end_matches('/'), path)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        error!(%status, %body, "Groq API request failed");
        Err(LlmError::Status { status, body })
    }

    /// Lists the models visible to this key. Used as the connectivity probe.
    #[instrument(skip(self), fields(api_base = %self.settings.api_base))]
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let response = self
            .http
            .get(self.endpoint("models"))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let models = Self::check_status(response)
            .await?
            .json::<ModelList>()
            .await?;

        debug!(count = models.data.len(), "Listed Groq models");
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    /// Sends the whole transcript and returns the first choice's text.
    #[instrument(skip(self, messages), fields(model = %self.settings.model, messages = messages.len()))]
    pub async fn create_chat_completion(&self, messages: &[Message]) -> Result<String, LlmError> {
        let request = ChatCompletionRequest {
            model: &self.settings.model,
            messages,
            temperature: constants::TEMPERATURE,
            max_tokens: constants::MAX_TOKENS,
            top_p: constants::TOP_P,
            stop: None,
            stream: false,
        };

        let response = self
            .http
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let completion = Self::check_status(response)
            .await?
            .json::<ChatCompletionResponse>()
            .await?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(LlmError::EmptyCompletion)?;

        debug!(chars = content.len(), "Received Groq completion");
        Ok(content)
    }
}
