//! The unit of pipeline work and its result type

use crate::pipeline::context::{Artifact, PipelineContext};
use crate::processing::parser::ParseFailure;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What went wrong in a stage; decides whether the run continues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Model output could not be parsed; flows downstream as a sentinel value
    Parse,
    /// A required source document produced no text
    Ingestion,
    /// Template lookup or rendering failed
    Configuration,
}

impl FailureKind {
    pub fn aborts_run(self) -> bool {
        match self {
            FailureKind::Parse => false,
            FailureKind::Ingestion | FailureKind::Configuration => true,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Parse => write!(f, "parse failure"),
            FailureKind::Ingestion => write!(f, "ingestion failure"),
            FailureKind::Configuration => write!(f, "configuration failure"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Offending text, kept verbatim for diagnosis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl StageFailure {
    pub fn parse(failure: ParseFailure) -> Self {
        Self {
            kind: FailureKind::Parse,
            message: format!("Failed to parse model response: {}", failure.reason),
            raw: Some(failure.raw),
        }
    }

    pub fn ingestion(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Ingestion,
            message: message.into(),
            raw: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Configuration,
            message: message.into(),
            raw: None,
        }
    }

    /// Value written to the context in place of the stage output when the
    /// failure does not abort the run
    pub fn degraded_artifact(&self) -> Option<Artifact> {
        if self.kind.aborts_run() {
            return None;
        }
        let failure = ParseFailure {
            raw: self.raw.clone().unwrap_or_default(),
            reason: self.message.clone(),
        };
        Some(Artifact::Structured(failure.sentinel()))
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

pub type StageResult = std::result::Result<Artifact, StageFailure>;

/// One step of a pipeline: reads named artifacts, produces exactly one
#[async_trait]
pub trait Stage: Send + Sync {
    /// Unique within a pipeline
    fn name(&self) -> &str;

    /// Artifacts that must exist in the context before `run`
    fn reads(&self) -> &[&str];

    /// Artifact name the output is stored under
    fn writes(&self) -> &str;

    /// Catalogue template this stage renders, checked before the run starts
    fn template(&self) -> Option<&str> {
        None
    }

    async fn run(&self, context: &PipelineContext) -> StageResult;
}
