//! Input manager: dispatches a path to the right extractor

use crate::error::{JobAgentError, Result};
use crate::input::document::{Document, DocumentKind};
use crate::input::file_detector::FileType;
use crate::input::text_extractor::{MarkdownExtractor, PdfExtractor, PlainTextExtractor, TextExtractor};
use log::{error, info};
use std::path::Path;

#[derive(Debug, Default, Clone, Copy)]
pub struct InputManager;

impl InputManager {
    pub fn new() -> Self {
        Self
    }

    pub async fn extract_text(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(JobAgentError::InvalidInput(format!(
                "File does not exist: {}",
                path.display()
            )));
        }

        match FileType::from_path(path) {
            FileType::Pdf => {
                info!("Reading PDF: {}", path.display());
                PdfExtractor.extract(path).await
            }
            FileType::Text => {
                info!("Reading text file: {}", path.display());
                PlainTextExtractor.extract(path).await
            }
            FileType::Markdown => {
                info!("Reading markdown file: {}", path.display());
                MarkdownExtractor.extract(path).await
            }
            FileType::Unknown => Err(JobAgentError::UnsupportedFormat(format!(
                "Unsupported file type for: {}",
                path.display()
            ))),
        }
    }

    /// Extract a document of the given kind, keeping its source path
    pub async fn load_document(&self, path: &Path, kind: DocumentKind) -> Result<Document> {
        let text = self.extract_text(path).await?;
        Ok(Document::new(text, path.display().to_string(), kind))
    }

    /// Ingest a document, yielding an empty string on any failure.
    ///
    /// Callers treat the empty string as "ingestion failed".
    pub async fn ingest(&self, path: &Path) -> String {
        match self.extract_text(path).await {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to ingest {}: {}", path.display(), e);
                String::new()
            }
        }
    }
}
