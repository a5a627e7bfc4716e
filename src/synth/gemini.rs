//! Query synthesis backed by the Gemini `generateContent` API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Error, Synthesizer};
use crate::config::ModelConfig;

const MAX_ERROR_BODY_CHARS: usize = 200;

pub struct GeminiSynthesizer {
    client: Client,
    api_key: String,
    url: String,
    model: String,
    template: String,
}

impl GeminiSynthesizer {
    /// Create a synthesizer that prepends `template` to every question.
    pub fn new(config: &ModelConfig, template: impl Into<String>) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(Error::Request)?;
        let url = format!(
            "{endpoint}/models/{model}:generateContent",
            endpoint = config.endpoint.trim_end_matches('/'),
            model = config.model,
        );

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            url,
            model: config.model.clone(),
            template: template.into(),
        })
    }
}

#[async_trait]
impl Synthesizer for GeminiSynthesizer {
    #[tracing::instrument(skip_all, fields(model = %self.model))]
    async fn synthesize(&self, question: &str) -> Result<String, Error> {
        let request = GenerateContentRequest::new(&self.template, question);

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(Error::Request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status,
                message: error_message(&body),
            });
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(Error::Decode)?;
        let text = parsed.completion_text()?;
        tracing::debug!(completion = %text, "received completion");

        Ok(text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

impl<'a> GenerateContentRequest<'a> {
    /// The template and the question travel as two parts of a single turn.
    fn new(template: &'a str, question: &'a str) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: template }, Part { text: question }],
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn completion_text(self) -> Result<String, Error> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return match self.prompt_feedback.and_then(|f| f.block_reason) {
                Some(reason) => Err(Error::Blocked(reason)),
                None => Err(Error::EmptyCompletion),
            };
        };

        let texts = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>();
        if texts.is_empty() {
            return Err(Error::EmptyCompletion);
        }

        Ok(texts.concat())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    }
}
