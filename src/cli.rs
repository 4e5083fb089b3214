//! CLI interface for the job agent

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Parser)]
#[command(name = "job-agent")]
#[command(about = "LLM-assisted job application toolkit")]
#[command(long_about = "Analyze job descriptions and resumes, score their fit, and draft tailored application material with a hosted language model")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print results without writing artifacts to the output directory
    #[arg(long, global = true)]
    pub no_save: bool,
}

/// Resume and job description pair shared by most commands
#[derive(Args, Debug, Clone)]
pub struct DocumentPair {
    /// Resume file (PDF, TXT, MD); bare names resolve inside the input directory
    #[arg(short, long)]
    pub resume: PathBuf,

    /// Job description file (PDF, TXT, MD)
    #[arg(short, long)]
    pub job: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that the model service answers
    TestConnection,

    /// Extract text from a document and show a preview
    Ingest {
        file: PathBuf,

        /// Treat the file as a job description rather than a resume
        #[arg(long)]
        job: bool,
    },

    /// Extract structured details from a job description
    AnalyzeJob {
        file: PathBuf,
    },

    /// Extract structured details from a resume
    AnalyzeResume {
        file: PathBuf,
    },

    /// Score how well a resume fits a job description
    Fitment {
        #[command(flatten)]
        documents: DocumentPair,
    },

    /// Rewrite resume content for a job description
    Tailor {
        #[command(flatten)]
        documents: DocumentPair,
    },

    /// Draft a cover letter
    CoverLetter {
        #[command(flatten)]
        documents: DocumentPair,

        /// Letter style, e.g. standard, concise, enthusiastic
        #[arg(short, long, default_value = "standard")]
        format: String,
    },

    /// Draft an outreach email from a job description
    Email {
        /// Job description file
        #[arg(short, long)]
        job: PathBuf,

        /// Email purpose, e.g. application, networking, follow-up
        #[arg(short, long, default_value = "application")]
        email_type: String,
    },

    /// Predict interview questions with suggested answers
    InterviewPrep {
        #[command(flatten)]
        documents: DocumentPair,
    },

    /// Run every stage from analysis to interview preparation
    Run {
        #[command(flatten)]
        documents: DocumentPair,

        /// Cover letter style
        #[arg(long, default_value = "standard")]
        format: String,

        /// Email purpose
        #[arg(long, default_value = "application")]
        email_type: String,
    },

    /// Inspect the prompt template catalogue
    Templates {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum TemplateAction {
    /// List template names and descriptions
    List,

    /// Print one template's instruction and placeholders
    Show {
        name: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,

    /// Print the configuration file location
    Path,
}

/// First `max_chars` characters of `text`, never splitting a grapheme
pub fn preview(text: &str, max_chars: usize) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() <= max_chars {
        return text.to_string();
    }
    format!("{}...", graphemes[..max_chars].concat())
}
