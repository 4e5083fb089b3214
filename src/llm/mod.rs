//! Model service boundary: text generation, embeddings and prompt templates

pub mod client;
pub mod gemini;
pub mod mock;
pub mod prompts;

pub use client::{Embedder, ModelService, TextGenerator};
pub use gemini::GeminiClient;
pub use mock::MockModel;
pub use prompts::{PromptParams, PromptTemplate, TemplateCatalogue};
