//! Gemini HTTP client for generation and embeddings

use crate::config::Config;
use crate::error::{JobAgentError, Result};
use crate::llm::client::{Embedder, TextGenerator};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
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
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Client for the Gemini `generateContent` and `embedContent` endpoints
#[derive(Clone)]
pub struct GeminiClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    generation_model: String,
    embedding_model: String,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        generation_model: impl Into<String>,
        embedding_model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http_client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            generation_model: generation_model.into(),
            embedding_model: embedding_model.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.llm.base_url.clone(),
            config.api_key()?,
            config.llm.generation_model.clone(),
            config.llm.embedding_model.clone(),
            config.request_timeout(),
        )
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.base_url,
            model_path(&self.generation_model)
        )
    }

    fn embed_url(&self) -> String {
        format!(
            "{}/{}:embedContent",
            self.base_url,
            model_path(&self.embedding_model)
        )
    }

    async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .http_client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!("Gemini API returned {}: {}", status, message);
            return Err(JobAgentError::ModelCall(format!(
                "API error (status {}): {}",
                status.as_u16(),
                message
            )));
        }

        Ok(response.json::<T>().await?)
    }
}

/// Gemini model ids are addressed as `models/<id>`
fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        info!("Sending request to {}...", self.generation_model);
        let start_time = Instant::now();

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };
        let response: GenerateResponse = self.post_json(&self.generate_url(), &request).await?;

        debug!("Generation finished in {:.2?}", start_time.elapsed());
        response
            .text()
            .ok_or_else(|| JobAgentError::ModelCall("Model returned no text content".to_string()))
    }

    fn name(&self) -> &str {
        &self.generation_model
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let clean_text = text.replace('\n', " ");
        let model = model_path(&self.embedding_model);

        let request = EmbedRequest {
            model: &model,
            content: Content {
                parts: vec![Part { text: &clean_text }],
            },
            task_type: "RETRIEVAL_DOCUMENT",
        };
        let response: EmbedResponse = self.post_json(&self.embed_url(), &request).await?;

        debug!("Received {}-dimensional embedding", response.embedding.values.len());
        Ok(response.embedding.values)
    }

    fn name(&self) -> &str {
        &self.embedding_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> GeminiClient {
        GeminiClient::new(
            "https://example.test/v1beta/",
            "key",
            "gemini-2.5-flash",
            "models/text-embedding-004",
            Some(Duration::from_secs(5)),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_urls() {
        let client = client();
        assert_eq!(
            client.generate_url(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            client.embed_url(),
            "https://example.test/v1beta/models/text-embedding-004:embedContent"
        );
    }

    #[test]
    fn test_embed_request_shape() {
        let request = EmbedRequest {
            model: "models/text-embedding-004",
            content: Content {
                parts: vec![Part { text: "rust engineer" }],
            },
            task_type: "RETRIEVAL_DOCUMENT",
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "models/text-embedding-004",
                "content": {"parts": [{"text": "rust engineer"}]},
                "taskType": "RETRIEVAL_DOCUMENT"
            })
        );
    }

    #[test]
    fn test_generate_response_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "there"}]}}]
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("Hello there"));

        let empty: GenerateResponse = serde_json::from_value(json!({"candidates": []})).unwrap();
        assert!(empty.text().is_none());
    }
}
