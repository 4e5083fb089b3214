//! Model service boundary: text generation and embeddings

use crate::error::Result;
use async_trait::async_trait;
use log::{debug, error};
use std::sync::Arc;

/// Free-form text completion
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    fn name(&self) -> &str;
}

/// Fixed-dimension text embeddings
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn name(&self) -> &str;
}

/// The generator/embedder pair handed to every stage.
///
/// Failures are degraded here rather than propagated: a failed generation
/// becomes an inline error string and a failed embedding an empty vector.
#[derive(Clone)]
pub struct ModelService {
    generator: Arc<dyn TextGenerator>,
    embedder: Arc<dyn Embedder>,
}

impl ModelService {
    pub fn new(generator: Arc<dyn TextGenerator>, embedder: Arc<dyn Embedder>) -> Self {
        Self { generator, embedder }
    }

    /// Use one client for both operations
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: TextGenerator + Embedder + 'static,
    {
        Self {
            generator: client.clone(),
            embedder: client,
        }
    }

    pub async fn generate(&self, prompt: &str) -> String {
        debug!(
            "Sending {} character prompt to {}",
            prompt.len(),
            self.generator.name()
        );
        match self.generator.generate(prompt).await {
            Ok(text) => text,
            Err(e) => {
                error!("Generation error from {}: {}", self.generator.name(), e);
                inline_generation_error(&e.to_string())
            }
        }
    }

    pub async fn embed(&self, text: &str) -> Vec<f32> {
        match self.embedder.embed(text).await {
            Ok(vector) => vector,
            Err(e) => {
                error!("Embedding error from {}: {}", self.embedder.name(), e);
                Vec::new()
            }
        }
    }

    /// Generation without degradation, for connectivity checks
    pub async fn try_generate(&self, prompt: &str) -> Result<String> {
        self.generator.generate(prompt).await
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }
}

impl std::fmt::Debug for ModelService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelService")
            .field("generator", &self.generator.name())
            .field("embedder", &self.embedder.name())
            .finish()
    }
}

pub fn inline_generation_error(details: &str) -> String {
    format!("Error: Could not generate content. Details: {}", details)
}
