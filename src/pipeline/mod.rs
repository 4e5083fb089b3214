//! Stage orchestration: a shared context threaded through an ordered list of stages

pub mod artifacts;
pub mod context;
pub mod stage;
pub mod orchestrator;
pub mod stages;
pub mod presets;

pub use context::{Artifact, PipelineContext};
pub use orchestrator::{AbortReason, Pipeline, PipelineRun, RunAbort, StageOutcome, StageStatus};
pub use stage::{FailureKind, Stage, StageFailure, StageResult};
pub use stages::StageServices;
