//! Console rendering and on-disk export of pipeline runs

pub mod console;
pub mod export;

pub use console::ConsoleFormatter;
pub use export::ArtifactWriter;
