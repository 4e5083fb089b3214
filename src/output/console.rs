//! Colored console rendering of pipeline runs

use crate::pipeline::artifacts::FITMENT;
use crate::pipeline::context::Artifact;
use crate::pipeline::orchestrator::{AbortReason, PipelineRun, StageStatus};
use colored::{Color, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct ConsoleFormatter {
    use_colors: bool,
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_header(&self, title: &str, level: u8) -> String {
        let prefix = match level {
            1 => "█",
            2 => "▓",
            _ => "▒",
        };
        let color = match level {
            1 => Color::Blue,
            2 => Color::Green,
            _ => Color::Yellow,
        };

        if self.use_colors {
            format!("\n{} {}\n", prefix.color(color).bold(), title.color(color).bold())
        } else {
            format!("\n{} {}\n", prefix, title)
        }
    }

    fn format_score_badge(&self, percentage: f64) -> String {
        let (badge, color) = match percentage {
            p if p >= 85.0 => ("STRONG", Color::Green),
            p if p >= 70.0 => ("GOOD", Color::BrightGreen),
            p if p >= 55.0 => ("FAIR", Color::Yellow),
            _ => ("WEAK", Color::BrightRed),
        };

        if self.use_colors {
            format!("[{}]", badge.color(color).bold())
        } else {
            format!("[{}]", badge)
        }
    }

    fn status_label(&self, status: &StageStatus) -> String {
        match status {
            StageStatus::Completed => self.colorize("completed", Color::Green),
            StageStatus::Degraded { .. } => self.colorize("degraded", Color::Yellow),
            StageStatus::Aborted => self.colorize("aborted", Color::Red),
            StageStatus::NotRun => self.colorize("not run", Color::BrightBlack),
        }
    }

    /// Per-stage status table plus the fitment score when one was produced
    pub fn format_run(&self, run: &PipelineRun) -> String {
        let mut output = String::new();

        output.push_str(&self.format_header(&format!("Pipeline: {}", run.pipeline), 1));
        output.push_str(&format!("Finished in {}ms\n", run.elapsed_ms));

        output.push_str(&self.format_header("Stages", 2));
        for outcome in &run.outcomes {
            output.push_str(&format!(
                "  {:<26} {:<12} -> {} ({}ms)\n",
                outcome.stage,
                self.status_label(&outcome.status),
                outcome.output,
                outcome.elapsed_ms
            ));
            if let StageStatus::Degraded { failure } = &outcome.status {
                output.push_str(&format!("      {}\n", self.colorize(&failure.message, Color::Yellow)));
            }
        }

        if let Some(Artifact::Structured(fitment)) = run.context.get(FITMENT) {
            output.push_str(&self.format_header("Fitment", 2));
            let percentage = fitment
                .get("match_percentage")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            output.push_str(&format!(
                "Semantic match: {:.2}% {}\n",
                percentage,
                self.format_score_badge(percentage)
            ));
            if fitment.get("semantic_available").and_then(|v| v.as_bool()) == Some(false) {
                output.push_str(&format!(
                    "{}\n",
                    self.colorize("Embeddings were unavailable for this run", Color::Yellow)
                ));
            }
            if let Some(recommendation) = fitment
                .get("analysis")
                .and_then(|a| a.get("recommendation"))
                .and_then(|r| r.as_str())
            {
                output.push_str(&format!("Recommendation: {}\n", self.colorize(recommendation, Color::Cyan)));
            }
        }

        if let Some(abort) = &run.abort {
            output.push_str(&self.format_header("Run aborted", 2));
            let reason = match &abort.reason {
                AbortReason::UnmetDependency { missing } => {
                    format!("missing artifacts: {}", missing.join(", "))
                }
                AbortReason::Failed { failure } => failure.to_string(),
            };
            output.push_str(&format!("{}: {}\n", abort.stage, self.colorize(&reason, Color::Red)));
        }

        output
    }

    /// Full text of one artifact, structured values pretty-printed
    pub fn format_artifact(&self, name: &str, artifact: &Artifact) -> String {
        let body = match artifact {
            Artifact::Text(text) => text.clone(),
            Artifact::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        };
        format!("{}{}\n", self.format_header(name, 3), body)
    }
}

/// Spinner shown while a pipeline runs
pub fn pipeline_spinner(pipeline: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Running {}", pipeline));
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
