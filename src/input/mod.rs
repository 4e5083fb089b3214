//! Input processing module
//! Handles file detection, text extraction, and document ingestion

pub mod document;
pub mod file_detector;
pub mod text_extractor;
pub mod manager;

pub use document::{Document, DocumentKind};
pub use manager::InputManager;
