mod anthropic;
mod openai;

use crate::config::AssessmentConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// The closed set of supported AI providers. Dispatch happens on this
/// enumeration, never on free-form strings from the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    pub fn ordered() -> [ProviderKind; 2] {
        [ProviderKind::OpenAi, ProviderKind::Anthropic]
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    pub fn parse(raw: &str) -> Option<ProviderKind> {
        ProviderKind::ordered()
            .into_iter()
            .find(|kind| kind.slug() == raw.trim())
    }

    /// Issues the single outbound analysis request for this provider. One
    /// attempt, bounded by the configured timeout; the caller degrades to a
    /// static message on failure.
    pub async fn analyze(
        &self,
        config: &AssessmentConfig,
        credential: &str,
        prompt: &str,
        options: &AnalysisOptions,
    ) -> Result<String, ProviderError> {
        match self {
            ProviderKind::OpenAi => openai::analyze(config, credential, prompt, options).await,
            ProviderKind::Anthropic => {
                anthropic::analyze(config, credential, prompt, options).await
            }
        }
    }
}

/// Tunables for one analysis call.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.2,
            max_tokens: 1024,
            timeout_secs: 20,
        }
    }
}

impl AnalysisOptions {
    pub fn clamped_temperature(&self) -> f32 {
        self.temperature.clamp(0.0, 1.0)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connect phase gets its own, tighter bound.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.min(10))
    }
}

#[derive(Debug)]
pub enum ProviderError {
    Http(reqwest::Error),
    Api { status: u16, message: String },
    EmptyCompletion,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Http(err) => write!(f, "request failed: {err}"),
            ProviderError::Api { status, message } => {
                write!(f, "provider returned {status}: {message}")
            }
            ProviderError::EmptyCompletion => {
                write!(f, "provider response contained no completion text")
            }
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProviderError::Http(err) => Some(err),
            ProviderError::Api { .. } | ProviderError::EmptyCompletion => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

pub(crate) fn build_client(options: &AnalysisOptions) -> Result<reqwest::Client, ProviderError> {
    // TLS certificate and host verification stay at reqwest defaults.
    reqwest::Client::builder()
        .timeout(options.request_timeout())
        .connect_timeout(options.connect_timeout())
        .build()
        .map_err(ProviderError::Http)
}

/// Turns a non-2xx response body into an error, surfacing the provider's own
/// error message when the body carries one. Both vendors nest it under
/// `error.message`.
pub(crate) fn api_error(status: u16, body: &str) -> ProviderError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());
    ProviderError::Api { status, message }
}
