//! Response parsing, embeddings and similarity scoring

pub mod embeddings;
pub mod parser;
pub mod similarity;
