//! Accumulating artifact store for one pipeline run

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Value produced by a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Artifact {
    Text(String),
    Structured(Value),
}

impl Artifact {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Artifact::Text(text) => Some(text),
            Artifact::Structured(_) => None,
        }
    }

    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            Artifact::Structured(value) => Some(value),
            Artifact::Text(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Artifact::Text(_))
    }
}

impl From<String> for Artifact {
    fn from(text: String) -> Self {
        Artifact::Text(text)
    }
}

impl From<&str> for Artifact {
    fn from(text: &str) -> Self {
        Artifact::Text(text.to_string())
    }
}

impl From<Value> for Artifact {
    fn from(value: Value) -> Self {
        Artifact::Structured(value)
    }
}

/// Artifact name to value, owned by exactly one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineContext {
    artifacts: BTreeMap<String, Artifact>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an artifact, builder style
    pub fn with(mut self, name: impl Into<String>, artifact: impl Into<Artifact>) -> Self {
        self.insert(name, artifact);
        self
    }

    /// Store an artifact, replacing any previous value under the same name
    pub fn insert(&mut self, name: impl Into<String>, artifact: impl Into<Artifact>) {
        self.artifacts.insert(name.into(), artifact.into());
    }

    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Artifact::as_text)
    }

    pub fn structured(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(Artifact::as_structured)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }

    /// Names from `required` that have no artifact yet, in the given order
    pub fn missing(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.contains(name))
            .map(|name| name.to_string())
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Artifact)> {
        self.artifacts.iter().map(|(name, artifact)| (name.as_str(), artifact))
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
