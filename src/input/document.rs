//! Ingested document structures

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Resume,
    JobDescription,
}

impl DocumentKind {
    /// Context artifact holding the raw text of this kind of document
    pub fn text_artifact(self) -> &'static str {
        match self {
            DocumentKind::Resume => crate::pipeline::artifacts::RESUME_TEXT,
            DocumentKind::JobDescription => crate::pipeline::artifacts::JD_TEXT,
        }
    }

    /// Context artifact holding the structured analysis of this kind of document
    pub fn analysis_artifact(self) -> &'static str {
        match self {
            DocumentKind::Resume => crate::pipeline::artifacts::RESUME_ANALYSIS,
            DocumentKind::JobDescription => crate::pipeline::artifacts::JD_ANALYSIS,
        }
    }

    pub fn analyzer_template(self) -> &'static str {
        match self {
            DocumentKind::Resume => "resume_analyzer",
            DocumentKind::JobDescription => "job_analyzer",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Resume => write!(f, "resume"),
            DocumentKind::JobDescription => write!(f, "job_description"),
        }
    }
}

/// Plain text content of one ingested file. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    content: String,
    source: String,
    kind: DocumentKind,
    word_count: usize,
    character_count: usize,
}

impl Document {
    pub fn new(content: String, source: String, kind: DocumentKind) -> Self {
        let word_count = content.split_whitespace().count();
        let character_count = content.chars().count();

        Self {
            content,
            source,
            kind,
            word_count,
            character_count,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn character_count(&self) -> usize {
        self.character_count
    }

    /// Ingestion yields empty text on failure
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}
