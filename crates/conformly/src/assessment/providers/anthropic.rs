use super::{api_error, build_client, AnalysisOptions, ProviderError};
use crate::config::AssessmentConfig;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

pub(super) async fn analyze(
    config: &AssessmentConfig,
    credential: &str,
    prompt: &str,
    options: &AnalysisOptions,
) -> Result<String, ProviderError> {
    let client = build_client(options)?;
    let model = options.model.as_deref().unwrap_or(DEFAULT_MODEL);
    let body = json!({
        "model": model,
        "max_tokens": options.max_tokens,
        "temperature": options.clamped_temperature(),
        "messages": [{ "role": "user", "content": prompt }],
    });

    debug!(%model, endpoint = %config.anthropic_endpoint, "requesting message completion");
    let response = client
        .post(&config.anthropic_endpoint)
        .header("x-api-key", credential)
        .header("anthropic-version", &config.anthropic_version)
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(api_error(status.as_u16(), &body));
    }

    let message: MessageResponse = response.json().await?;
    message
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(ProviderError::EmptyCompletion)
}
