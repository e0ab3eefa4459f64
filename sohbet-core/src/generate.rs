//! Text generation against the Gemini `generateContent` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::credentials::ServiceCredential;
use crate::errors::{PipelineError, PipelineResult};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// The generation seam: the pipeline only needs "prompt text in, answer text
/// out", so tests can substitute a recording implementation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> PipelineResult<String>;
}

/// How the generation call authenticates.
#[derive(Clone)]
pub enum GeminiAuth {
    /// Plain API key passed as a query parameter.
    ApiKey(String),
    /// Service account; a bearer token is minted per call from the
    /// normalized credential.
    ServiceAccount(ServiceCredential),
}

/// Sampling parameters, all optional and sourced from configuration.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
}

impl GenerationOptions {
    fn to_config(&self) -> Option<GenerationConfig> {
        if self.max_output_tokens.is_none() && self.temperature.is_none() && self.top_p.is_none() {
            return None;
        }
        Some(GenerationConfig {
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        })
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parts: Option<Vec<Part>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

/// Tagged decode of the provider response. Only `Success` carries usable
/// text; everything else turns into an explicit generation failure.
#[derive(Debug)]
enum GenerationOutcome {
    Success(String),
    Empty,
    Malformed(Value),
}

fn decode_response(value: Value) -> GenerationOutcome {
    let Ok(response) = serde_json::from_value::<GenerateContentResponse>(value.clone()) else {
        return GenerationOutcome::Malformed(value);
    };

    let text = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .and_then(|parts| parts.into_iter().find_map(|part| part.text));

    match text {
        Some(text) if !text.trim().is_empty() => GenerationOutcome::Success(text),
        _ => GenerationOutcome::Empty,
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let cut: String = text.chars().take(limit).collect();
        format!("{cut}...")
    }
}

pub struct GeminiGenerator {
    model_id: String,
    auth: GeminiAuth,
    base_url: String,
    options: GenerationOptions,
    client: Client,
}

impl GeminiGenerator {
    pub fn new(
        model_id: impl Into<String>,
        auth: GeminiAuth,
        options: GenerationOptions,
    ) -> PipelineResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            model_id: model_id.into(),
            auth,
            base_url: DEFAULT_BASE_URL.to_string(),
            options,
            client,
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> PipelineResult<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: Some(vec![Part {
                    text: Some(prompt.to_string()),
                }]),
            }],
            generation_config: self.options.to_config(),
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model_id);
        let mut builder = self.client.post(&url).json(&request);
        builder = match &self.auth {
            GeminiAuth::ApiKey(key) => builder.query(&[("key", key.as_str())]),
            GeminiAuth::ServiceAccount(credential) => {
                let token = credential.access_token(&self.client).await?;
                builder.bearer_auth(token)
            }
        };

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::GenerationFailed(format!(
                "provider returned status {status}: {}",
                truncate(&body, 300)
            )));
        }

        let value: Value = response.json().await?;
        match decode_response(value) {
            GenerationOutcome::Success(text) => Ok(text),
            GenerationOutcome::Empty => Err(PipelineError::GenerationFailed(
                "model returned no candidate with text".to_string(),
            )),
            GenerationOutcome::Malformed(raw) => Err(PipelineError::GenerationFailed(format!(
                "unexpected response shape: {}",
                truncate(&raw.to_string(), 300)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_first_candidate_text() {
        let outcome = decode_response(json!({
            "candidates": [
                { "content": { "role": "model", "parts": [{ "text": "Merhaba!" }] } },
                { "content": { "role": "model", "parts": [{ "text": "ikinci" }] } }
            ]
        }));
        match outcome {
            GenerationOutcome::Success(text) => assert_eq!(text, "Merhaba!"),
            other => panic!("expected Success, got {other:?}"),
        }
    }

    #[test]
    fn missing_candidates_is_empty() {
        assert!(matches!(
            decode_response(json!({})),
            GenerationOutcome::Empty
        ));
        assert!(matches!(
            decode_response(json!({ "candidates": [] })),
            GenerationOutcome::Empty
        ));
    }

    #[test]
    fn whitespace_only_text_is_empty() {
        let outcome = decode_response(json!({
            "candidates": [{ "content": { "parts": [{ "text": "   " }] } }]
        }));
        assert!(matches!(outcome, GenerationOutcome::Empty));
    }

    #[test]
    fn non_object_body_is_malformed() {
        assert!(matches!(
            decode_response(json!("oops")),
            GenerationOutcome::Malformed(_)
        ));
    }

    #[test]
    fn request_serializes_camel_case() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: Some(vec![Part {
                    text: Some("soru".to_string()),
                }]),
            }],
            generation_config: GenerationOptions {
                max_output_tokens: Some(512),
                temperature: Some(0.7),
                top_p: None,
            }
            .to_config(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "soru");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 512);
        assert!(value["generationConfig"].get("topP").is_none());
    }

    #[test]
    fn empty_options_omit_generation_config() {
        let request = GenerateContentRequest {
            contents: Vec::new(),
            generation_config: GenerationOptions::default().to_config(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("generationConfig").is_none());
    }
}
