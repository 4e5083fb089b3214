//! Writing run artifacts to disk

use crate::error::Result;
use crate::pipeline::context::Artifact;
use crate::pipeline::orchestrator::{PipelineRun, RunAbort, StageOutcome};
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const SUMMARY_FILE: &str = "run_summary.json";

#[derive(Serialize)]
struct RunSummary<'a> {
    pipeline: &'a str,
    generated_at: String,
    completed: bool,
    elapsed_ms: u64,
    stages: &'a [StageOutcome],
    #[serde(skip_serializing_if = "Option::is_none")]
    abort: Option<&'a RunAbort>,
    artifacts: Vec<String>,
}

/// Exports the context of a run, one file per artifact
pub struct ArtifactWriter {
    output_dir: PathBuf,
    pretty: bool,
    timestamped: bool,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            pretty: true,
            timestamped: false,
        }
    }

    pub fn with_pretty_json(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Put each run in its own `<pipeline>_<timestamp>` directory
    pub fn with_timestamped_runs(mut self, timestamped: bool) -> Self {
        self.timestamped = timestamped;
        self
    }

    pub fn run_dir(&self, pipeline: &str) -> PathBuf {
        if self.timestamped {
            let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            self.output_dir.join(format!("{}_{}", pipeline, stamp))
        } else {
            self.output_dir.clone()
        }
    }

    pub fn file_name(name: &str, artifact: &Artifact) -> String {
        match artifact {
            Artifact::Text(_) => format!("{}.md", name),
            Artifact::Structured(_) => format!("{}.json", name),
        }
    }

    /// Write every artifact plus the run summary; returns the directory used
    pub fn write_run(&self, run: &PipelineRun) -> Result<PathBuf> {
        let dir = self.run_dir(&run.pipeline);
        fs::create_dir_all(&dir)?;

        let mut written = Vec::new();
        for (name, artifact) in run.context.iter() {
            let file_name = Self::file_name(name, artifact);
            self.write_artifact(&dir.join(&file_name), artifact)?;
            written.push(file_name);
        }

        let summary = RunSummary {
            pipeline: &run.pipeline,
            generated_at: chrono::Local::now().to_rfc3339(),
            completed: run.is_complete(),
            elapsed_ms: run.elapsed_ms,
            stages: &run.outcomes,
            abort: run.abort.as_ref(),
            artifacts: written,
        };
        fs::write(dir.join(SUMMARY_FILE), self.to_json(&summary)?)?;

        info!("Saved {} artifacts to {}", summary.artifacts.len(), dir.display());
        Ok(dir)
    }

    fn write_artifact(&self, path: &Path, artifact: &Artifact) -> Result<()> {
        match artifact {
            Artifact::Text(text) => fs::write(path, text)?,
            Artifact::Structured(value) => fs::write(path, self.to_json(value)?)?,
        }
        Ok(())
    }

    fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        Ok(if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::context::PipelineContext;
    use crate::pipeline::orchestrator::StageStatus;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn run() -> PipelineRun {
        PipelineRun {
            pipeline: "email".to_string(),
            context: PipelineContext::new()
                .with("jd_text", "We are hiring.")
                .with("jd_analysis", json!({"role_title": "SRE"}))
                .with("email", "Hello there"),
            outcomes: vec![StageOutcome {
                stage: "draft_email".to_string(),
                output: "email".to_string(),
                status: StageStatus::Completed,
                elapsed_ms: 3,
            }],
            abort: None,
            elapsed_ms: 5,
        }
    }

    #[test]
    fn test_write_run_creates_one_file_per_artifact() {
        let dir = TempDir::new().unwrap();
        let out = ArtifactWriter::new(dir.path()).write_run(&run()).unwrap();

        assert_eq!(out, dir.path());
        assert_eq!(fs::read_to_string(out.join("email.md")).unwrap(), "Hello there");
        let analysis: Value =
            serde_json::from_str(&fs::read_to_string(out.join("jd_analysis.json")).unwrap()).unwrap();
        assert_eq!(analysis["role_title"], "SRE");

        let summary: Value =
            serde_json::from_str(&fs::read_to_string(out.join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(summary["completed"], true);
        assert_eq!(summary["stages"][0]["status"], "completed");
        assert_eq!(summary["artifacts"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_timestamped_run_dir() {
        let writer = ArtifactWriter::new("out").with_timestamped_runs(true);
        let dir = writer.run_dir("fitment");
        let name = dir.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("fitment_"));
        assert_eq!(dir.parent(), Some(Path::new("out")));
    }
}
