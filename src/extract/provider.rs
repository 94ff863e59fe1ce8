use std::env;
use std::fmt;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{ExtractError, ExtractResult};

/// Interchangeable chat-completion providers. All speak the
/// OpenAI-compatible `/chat/completions` wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    Openai,
    Groq,
    Openrouter,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Groq => "groq",
            Self::Openrouter => "openrouter",
        }
    }

    fn credential_env(self) -> &'static str {
        match self {
            Self::Openai => "OPENAI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::Openrouter => "OPENROUTER_API_KEY",
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            Self::Openai => "https://api.openai.com/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Openrouter => "https://openrouter.ai/api/v1",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            Self::Openai => "gpt-4o-mini",
            Self::Groq => "llama-3.3-70b-versatile",
            Self::Openrouter => "anthropic/claude-3.5-sonnet",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The text-generation collaborator seam; mocked in pipeline tests.
pub trait GenerationProvider {
    fn generate(&self, prompt: &str) -> ExtractResult<String>;
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Blocking HTTP client for one configured provider. Credentials are
/// resolved from the environment before any network call is made.
pub struct HttpProvider {
    kind: ProviderKind,
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl HttpProvider {
    pub fn from_env(kind: ProviderKind, timeout_ms: u64) -> ExtractResult<Self> {
        let api_key = env::var(kind.credential_env())
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ExtractError::MissingCredential {
                provider: kind.as_str().to_string(),
                env_var: kind.credential_env().to_string(),
            })?;

        let base_url = env::var("LEXRULE_API_BASE")
            .unwrap_or_else(|_| kind.default_base_url().to_string());
        let model = env::var("LEXRULE_MODEL").unwrap_or_else(|_| kind.default_model().to_string());

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(timeout_ms.max(1)))
            .build()
            .map_err(|err| ExtractError::Provider(err.to_string()))?;

        Ok(Self {
            kind,
            api_key,
            base_url,
            model,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl GenerationProvider for HttpProvider {
    fn generate(&self, prompt: &str) -> ExtractResult<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: self.model.clone(),
            temperature: 0.0,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        debug!(provider = self.kind.as_str(), model = %self.model, "sending extraction request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|err| ExtractError::Provider(format!("{url}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let snippet: String = body.chars().take(300).collect();
            return Err(ExtractError::Provider(format!(
                "{url} returned {status}: {snippet}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|err| ExtractError::Provider(format!("{url}: invalid envelope: {err}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                ExtractError::MalformedResponse("provider returned no completion content".to_string())
            })
    }
}
