//! Scripted in-process model for tests and dry runs

use crate::error::{JobAgentError, Result};
use crate::llm::client::{Embedder, TextGenerator};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Generation reply queued on a [`MockModel`]
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Failure(String),
}

/// Model double: replies are served in FIFO order, embeddings are looked up
/// by exact text and fall back to a default vector.
pub struct MockModel {
    name: String,
    replies: Mutex<VecDeque<MockReply>>,
    prompts: Mutex<Vec<String>>,
    embeddings: Mutex<HashMap<String, Vec<f32>>>,
    default_embedding: Vec<f32>,
    embedding_failure: Option<String>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::with_name("MockModel")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            embeddings: Mutex::new(HashMap::new()),
            default_embedding: vec![1.0, 0.0],
            embedding_failure: None,
        }
    }

    pub fn with_default_embedding(mut self, vector: Vec<f32>) -> Self {
        self.default_embedding = vector;
        self
    }

    pub fn with_embedding_failure(mut self, message: impl Into<String>) -> Self {
        self.embedding_failure = Some(message.into());
        self
    }

    pub fn push_response(&self, text: impl Into<String>) {
        self.lock_replies().push_back(MockReply::Text(text.into()));
    }

    pub fn push_responses<I, S>(&self, texts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut queue = self.lock_replies();
        for text in texts {
            queue.push_back(MockReply::Text(text.into()));
        }
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.lock_replies().push_back(MockReply::Failure(message.into()));
    }

    pub fn set_embedding(&self, text: impl Into<String>, vector: Vec<f32>) {
        self.embeddings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(text.into(), vector);
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn remaining_responses(&self) -> usize {
        self.lock_replies().len()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<MockReply>> {
        self.replies.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for MockModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(prompt.to_string());

        match self.lock_replies().pop_front() {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Failure(message)) => Err(JobAgentError::ModelCall(message)),
            None => Err(JobAgentError::ModelCall(
                "MockModel: no more responses in queue".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Embedder for MockModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(message) = &self.embedding_failure {
            return Err(JobAgentError::ModelCall(message.clone()));
        }

        let embeddings = self
            .embeddings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(embeddings
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.default_embedding.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MockModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockModel")
            .field("name", &self.name)
            .field("remaining_responses", &self.remaining_responses())
            .finish()
    }
}
