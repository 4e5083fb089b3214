//! Linear pipeline execution with dependency checks and failure policy

use crate::error::{JobAgentError, Result};
use crate::llm::prompts::TemplateCatalogue;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::stage::{FailureKind, Stage, StageFailure};
use log::{error, info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Instant;

/// Why a run stopped early
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbortReason {
    UnmetDependency { missing: Vec<String> },
    Failed { failure: StageFailure },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunAbort {
    pub stage: String,
    #[serde(flatten)]
    pub reason: AbortReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    /// Output replaced by a sentinel value; the run continued
    Degraded { failure: StageFailure },
    Aborted,
    NotRun,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageOutcome {
    pub stage: String,
    pub output: String,
    #[serde(flatten)]
    pub status: StageStatus,
    pub elapsed_ms: u64,
}

/// Everything a run produced, including how far it got
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub pipeline: String,
    pub context: PipelineContext,
    pub outcomes: Vec<StageOutcome>,
    pub abort: Option<RunAbort>,
    pub elapsed_ms: u64,
}

impl PipelineRun {
    pub fn is_complete(&self) -> bool {
        self.abort.is_none()
    }

    pub fn outcome(&self, stage: &str) -> Option<&StageOutcome> {
        self.outcomes.iter().find(|o| o.stage == stage)
    }

    pub fn degraded_stages(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, StageStatus::Degraded { .. }))
            .map(|o| o.stage.as_str())
            .collect()
    }

    /// Stages that did not produce their output
    pub fn incomplete_stages(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, StageStatus::Aborted | StageStatus::NotRun))
            .map(|o| o.stage.as_str())
            .collect()
    }

    /// The error describing an aborted run, if any
    pub fn error(&self) -> Option<JobAgentError> {
        let abort = self.abort.as_ref()?;
        let stage = abort.stage.clone();
        Some(match &abort.reason {
            AbortReason::UnmetDependency { missing } => JobAgentError::UnmetDependency {
                stage,
                missing: missing.clone(),
            },
            AbortReason::Failed { failure } if failure.kind == FailureKind::Ingestion => {
                JobAgentError::IngestionFailure {
                    stage,
                    message: failure.message.clone(),
                }
            }
            AbortReason::Failed { failure } => JobAgentError::StageAborted {
                stage,
                message: failure.message.clone(),
            },
        })
    }

    /// Final context on success, the abort error otherwise
    pub fn into_result(self) -> Result<PipelineContext> {
        match self.error() {
            Some(err) => Err(err),
            None => Ok(self.context),
        }
    }
}

/// An authored, ordered chain of stages
pub struct Pipeline {
    name: String,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Append a stage, builder style
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn push(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Check stage names are unique and every referenced template exists
    pub fn validate(&self, catalogue: &TemplateCatalogue) -> Result<()> {
        let mut seen = HashSet::new();
        for stage in &self.stages {
            if !seen.insert(stage.name()) {
                return Err(JobAgentError::DuplicateStage(stage.name().to_string()));
            }
            if let Some(template) = stage.template() {
                catalogue.get(template)?;
            }
        }
        Ok(())
    }

    /// Execute every stage in order against `context`.
    ///
    /// Stops at the first stage with unmet dependencies or an aborting
    /// failure; parse failures are stored as sentinel values and the run
    /// continues.
    pub async fn run(&self, mut context: PipelineContext) -> PipelineRun {
        let run_start = Instant::now();
        let mut outcomes = Vec::with_capacity(self.stages.len());
        let mut abort: Option<RunAbort> = None;

        info!("Starting pipeline '{}' ({} stages)", self.name, self.stages.len());

        for stage in &self.stages {
            let mut outcome = StageOutcome {
                stage: stage.name().to_string(),
                output: stage.writes().to_string(),
                status: StageStatus::NotRun,
                elapsed_ms: 0,
            };

            if abort.is_some() {
                outcomes.push(outcome);
                continue;
            }

            let missing = context.missing(stage.reads());
            if !missing.is_empty() {
                error!(
                    "Stage '{}' cannot run, missing artifacts: {}",
                    stage.name(),
                    missing.join(", ")
                );
                outcome.status = StageStatus::Aborted;
                abort = Some(RunAbort {
                    stage: stage.name().to_string(),
                    reason: AbortReason::UnmetDependency { missing },
                });
                outcomes.push(outcome);
                continue;
            }

            info!("Running stage '{}'", stage.name());
            let stage_start = Instant::now();
            let result = stage.run(&context).await;
            outcome.elapsed_ms = stage_start.elapsed().as_millis() as u64;

            match result {
                Ok(artifact) => {
                    info!(
                        "Stage '{}' produced '{}' in {}ms",
                        stage.name(),
                        stage.writes(),
                        outcome.elapsed_ms
                    );
                    context.insert(stage.writes(), artifact);
                    outcome.status = StageStatus::Completed;
                }
                Err(failure) => match failure.degraded_artifact() {
                    Some(degraded) => {
                        warn!("Stage '{}' degraded: {}", stage.name(), failure);
                        context.insert(stage.writes(), degraded);
                        outcome.status = StageStatus::Degraded { failure };
                    }
                    None => {
                        error!("Stage '{}' aborted the run: {}", stage.name(), failure);
                        outcome.status = StageStatus::Aborted;
                        abort = Some(RunAbort {
                            stage: stage.name().to_string(),
                            reason: AbortReason::Failed { failure },
                        });
                    }
                },
            }

            outcomes.push(outcome);
        }

        let elapsed_ms = run_start.elapsed().as_millis() as u64;
        match &abort {
            Some(a) => warn!("Pipeline '{}' stopped at stage '{}'", self.name, a.stage),
            None => info!("Pipeline '{}' finished in {}ms", self.name, elapsed_ms),
        }

        PipelineRun {
            pipeline: self.name.clone(),
            context,
            outcomes,
            abort,
            elapsed_ms,
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .finish()
    }
}
