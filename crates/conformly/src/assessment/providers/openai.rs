use super::{api_error, build_client, AnalysisOptions, ProviderError};
use crate::config::AssessmentConfig;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
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
        "messages": [{ "role": "user", "content": prompt }],
        "temperature": options.clamped_temperature(),
        "max_tokens": options.max_tokens,
    });

    debug!(%model, endpoint = %config.openai_endpoint, "requesting chat completion");
    let response = client
        .post(&config.openai_endpoint)
        .bearer_auth(credential)
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(api_error(status.as_u16(), &body));
    }

    let completion: ChatCompletionResponse = response.json().await?;
    completion
        .choices
        .into_iter()
        .find_map(|choice| choice.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(ProviderError::EmptyCompletion)
}
