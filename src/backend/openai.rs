use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::backend::media::{ContentPart, build_content_parts};
use crate::backend::{
    CompletionClient, GenerateResult, ImageRef, TokenUsage, check_response_status,
    handle_http_error,
};
use crate::config::TriageConfig;
use crate::error::{RequestFailureKind, Result, TriageError};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const PROVIDER: &str = "OpenAI";

/// Vision-capable OpenAI models.
///
/// Any other model name can be used through `Custom`, which is also what
/// [`Model::from_string`] returns for unknown names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Model {
    Gpt4O,
    Gpt4OMini,
    Gpt41,
    Gpt41Mini,
    /// Custom model name (new models or OpenAI-compatible endpoints)
    Custom(String),
}

impl Model {
    pub fn as_str(&self) -> &str {
        match self {
            Model::Gpt4O => "gpt-4o",
            Model::Gpt4OMini => "gpt-4o-mini",
            Model::Gpt41 => "gpt-4.1",
            Model::Gpt41Mini => "gpt-4.1-mini",
            Model::Custom(name) => name,
        }
    }

    /// Create a model from a string. Always succeeds.
    pub fn from_string(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.as_str() {
            "gpt-4o" => Model::Gpt4O,
            "gpt-4o-mini" => Model::Gpt4OMini,
            "gpt-4.1" => Model::Gpt41,
            "gpt-4.1-mini" => Model::Gpt41Mini,
            _ => Model::Custom(name),
        }
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Model::from_string(s))
    }
}

impl From<&str> for Model {
    fn from(s: &str) -> Self {
        Model::from_string(s)
    }
}

/// OpenAI (or OpenAI-compatible) chat-completion client.
pub struct OpenAIClient {
    config: TriageConfig,
    client: reqwest::Client,
}

// OpenAI API request and response structures
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    usage: Option<UsageInfo>,
    model: Option<String>,
}

impl OpenAIClient {
    /// Create a client with default settings (gpt-4o, temperature 0.0, no timeout).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use damage_triage::OpenAIClient;
    /// # use std::time::Duration;
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = OpenAIClient::new("your-openai-api-key")?
    ///     .timeout(Duration::from_secs(30));
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(name = "openai_client_new", skip(api_key))]
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::from_config(TriageConfig::new(api_key)?)
    }

    /// Create a client from `OPENAI_API_KEY` and the optional `DAMAGE_TRIAGE_*` variables.
    #[instrument(name = "openai_client_from_env")]
    pub fn from_env() -> Result<Self> {
        Self::from_config(TriageConfig::from_env()?)
    }

    /// Create a client from an explicit configuration.
    pub fn from_config(config: TriageConfig) -> Result<Self> {
        info!(
            model = %config.model.as_str(),
            temperature = config.temperature,
            max_tokens = ?config.max_tokens,
            timeout = ?config.timeout,
            base_url = %config.base_url,
            "Creating OpenAI client"
        );
        trace!("API key length: {}", config.api_key.len());
        let client = build_http_client(config.timeout)?;
        Ok(Self { config, client })
    }

    /// Set the model to use
    #[instrument(skip(self))]
    pub fn model(mut self, model: impl Into<Model> + std::fmt::Debug) -> Self {
        let model = model.into();
        debug!(previous_model = ?self.config.model, new_model = ?model, "Setting OpenAI model");
        self.config.model = model;
        self
    }

    /// Set the temperature (0.0 to 2.0, lower = more deterministic)
    #[instrument(skip(self))]
    pub fn temperature(mut self, temp: f32) -> Self {
        debug!(
            previous_temp = self.config.temperature,
            new_temp = temp,
            "Setting temperature"
        );
        self.config.temperature = temp;
        self
    }

    /// Set the maximum tokens to generate
    #[instrument(skip(self))]
    pub fn max_tokens(mut self, max: u32) -> Self {
        debug!(previous_max = ?self.config.max_tokens, new_max = max, "Setting max_tokens");
        self.config.max_tokens = Some(max.max(1));
        self
    }

    /// Set the timeout for the whole HTTP round trip.
    ///
    /// Requests exceeding it fail with [`TriageError::Timeout`].
    #[instrument(skip(self))]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        debug!(previous_timeout = ?self.config.timeout, new_timeout = ?timeout, "Setting timeout");
        self.config.timeout = Some(timeout);
        self.client = build_http_client(Some(timeout)).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build reqwest client with timeout, using default");
            reqwest::Client::new()
        });
        self
    }

    /// Point the client at an OpenAI-compatible endpoint (e.g. a proxy or a mock server).
    #[instrument(skip(self))]
    pub fn base_url(mut self, base_url: impl Into<String> + std::fmt::Debug) -> Self {
        let base_url = base_url.into();
        debug!(new_base_url = %base_url, "Setting base URL");
        self.config.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    fn build_request(&self, prompt: &str, image: &ImageRef) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.as_str().to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_content_parts(prompt, image),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}

fn build_http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(|e| {
        TriageError::Configuration(format!("failed to build HTTP client: {}", e))
    })
}

#[async_trait]
impl CompletionClient for OpenAIClient {
    #[instrument(
        name = "openai_complete_with_image",
        skip(self, prompt, image),
        fields(
            model = %self.config.model.as_str(),
            prompt_len = prompt.len(),
            image = %image.describe()
        )
    )]
    async fn complete_with_image(&self, prompt: &str, image: &ImageRef) -> Result<GenerateResult> {
        info!("Requesting completion with image from OpenAI");

        let request = self.build_request(prompt, image);
        let url = format!("{}/chat/completions", self.config.base_url);
        debug!(url = %url, "Sending request to OpenAI API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| handle_http_error(e, PROVIDER))?;
        let response = check_response_status(response, PROVIDER).await?;

        let body = response
            .text()
            .await
            .map_err(|e| handle_http_error(e, PROVIDER))?;
        let completion: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "Failed to parse JSON response from OpenAI");
            TriageError::request_failed(RequestFailureKind::MalformedResponse {
                details: e.to_string(),
            })
        })?;

        let usage = completion.usage.as_ref().map(|u| {
            TokenUsage::new(
                completion
                    .model
                    .clone()
                    .unwrap_or_else(|| self.config.model.as_str().to_string()),
                u.prompt_tokens,
                u.completion_tokens,
            )
        });

        let Some(choice) = completion.choices.into_iter().next() else {
            error!("OpenAI returned empty choices array");
            return Err(TriageError::request_failed(RequestFailureKind::EmptyResponse));
        };
        trace!(finish_reason = ?choice.finish_reason, "Completion finish reason");
        if choice.finish_reason.as_deref() == Some("length") {
            warn!("Completion was cut off by max_tokens, the report is likely truncated");
        }

        match choice.message.content {
            Some(content) if !content.trim().is_empty() => {
                debug!(content_len = content.len(), "Extracted content from response");
                Ok(GenerateResult::new(content, usage))
            }
            _ => {
                error!("No content in OpenAI response");
                Err(TriageError::request_failed(RequestFailureKind::EmptyResponse))
            }
        }
    }

    fn model_name(&self) -> &str {
        self.config.model.as_str()
    }
}
