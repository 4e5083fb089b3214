//! Local embeddings using Model2Vec

use crate::config::Config;
use crate::error::{JobAgentError, Result};
use crate::llm::client::Embedder;
use async_trait::async_trait;
use log::{debug, info};
use model2vec_rs::model::StaticModel;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Static-embedding backend that runs on the local CPU, with a per-text cache
pub struct EmbeddingEngine {
    model: Arc<StaticModel>,
    cache: Mutex<HashMap<String, Vec<f32>>>,
    model_name: String,
}

impl EmbeddingEngine {
    /// Load a model from a local folder or a HuggingFace repo id
    pub async fn load(repo_or_path: &str) -> Result<Self> {
        let start_time = Instant::now();
        info!("Loading Model2Vec embedding model: {}", repo_or_path);

        let source = repo_or_path.to_string();
        let model = tokio::task::spawn_blocking(move || {
            StaticModel::from_pretrained(&source, None, None, None)
        })
        .await
        .map_err(|e| JobAgentError::ModelCall(format!("Embedding model loader panicked: {}", e)))??;

        info!("Model loaded successfully in {:.2?}", start_time.elapsed());

        Ok(Self {
            model: Arc::new(model),
            cache: Mutex::new(HashMap::new()),
            model_name: repo_or_path.to_string(),
        })
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::load(&config.llm.model2vec_model).await
    }

    fn cached(&self, text: &str) -> Option<Vec<f32>> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(text)
            .cloned()
    }
}

#[async_trait]
impl Embedder for EmbeddingEngine {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(embedding) = self.cached(text) {
            debug!("Embedding cache hit ({} chars)", text.len());
            return Ok(embedding);
        }

        let model = Arc::clone(&self.model);
        let input = text.to_string();
        let embedding = tokio::task::spawn_blocking(move || model.encode_single(&input))
            .await
            .map_err(|e| JobAgentError::ModelCall(format!("Embedding task panicked: {}", e)))?;

        if embedding.is_empty() {
            return Err(JobAgentError::ModelCall(format!(
                "{} produced an empty embedding",
                self.model_name
            )));
        }

        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(text.to_string(), embedding.clone());

        Ok(embedding)
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}
