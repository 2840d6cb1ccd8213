use async_trait::async_trait;
use parley_core::{Message, Role};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{LlmError, Sampling, TextGenerator};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2:latest";

/// Chat client for a local Ollama server.
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Default for OllamaGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

impl From<&Message> for OllamaMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: match message.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: message.content.clone(),
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    #[instrument(skip(self, messages), fields(model = %self.model))]
    async fn generate(
        &self,
        messages: &[Message],
        sampling: Sampling,
    ) -> Result<Message, LlmError> {
        debug!(
            count = messages.len(),
            temperature = sampling.temperature,
            "requesting completion"
        );

        let request = OllamaChatRequest {
            model: self.model.clone(),
            messages: messages.iter().map(OllamaMessage::from).collect(),
            stream: false,
            options: OllamaOptions {
                temperature: sampling.temperature,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|error| LlmError::Unreachable(error.to_string()))?;

        if !response.status().is_success() {
            return Err(LlmError::Api(format!(
                "ollama returned status {}",
                response.status()
            )));
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|error| LlmError::InvalidResponse(error.to_string()))?;

        Ok(Message::assistant(chat_response.message.content))
    }

    async fn health_check(&self) -> Result<bool, LlmError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|error| LlmError::Unreachable(error.to_string()))?;

        Ok(response.status().is_success())
    }
}
