//! Job agent: LLM-assisted job application toolkit

use clap::Parser;
use job_agent::cli::{self, Cli, Commands, ConfigAction, DocumentPair, TemplateAction};
use job_agent::config::{Config, EmbeddingBackend};
use job_agent::error::Result;
use job_agent::input::{DocumentKind, InputManager};
use job_agent::llm::{Embedder, GeminiClient, ModelService, TemplateCatalogue, TextGenerator};
use job_agent::output::{console, ArtifactWriter, ConsoleFormatter};
use job_agent::pipeline::presets::{self, ApplicationOptions};
use job_agent::pipeline::{Pipeline, PipelineContext, StageServices};
use job_agent::processing::embeddings::EmbeddingEngine;
use log::{error, info};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

const PREVIEW_CHARS: usize = 500;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(e) = dotenvy::dotenv() {
        info!("No .env file loaded: {}", e);
    }

    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let config = match Config::load_from(&config_path).and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli, config, config_path).await {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

/// Shared state for commands that run a pipeline
struct App {
    config: Config,
    catalogue: Arc<TemplateCatalogue>,
    formatter: ConsoleFormatter,
    save: bool,
}

impl App {
    /// Loads the prompt catalogue; only pipeline commands need it
    fn load(config: Config, save: bool) -> Result<Self> {
        let catalogue = TemplateCatalogue::load_or_builtin(&config.paths.catalogue)?;
        Ok(Self {
            formatter: ConsoleFormatter::new(config.output.color_output),
            catalogue: Arc::new(catalogue),
            config,
            save,
        })
    }

    async fn services(&self) -> Result<Arc<StageServices>> {
        let model = build_model_service(&self.config).await?;
        Ok(Arc::new(
            StageServices::new(Arc::clone(&self.catalogue), model)
                .with_strict_placeholders(self.config.prompts.strict_placeholders),
        ))
    }

    fn documents(&self, documents: &DocumentPair) -> (PathBuf, PathBuf) {
        (
            self.config.resolve_input(&documents.resume),
            self.config.resolve_input(&documents.job),
        )
    }

    async fn execute(&self, pipeline: Pipeline) -> Result<()> {
        pipeline.validate(&self.catalogue)?;

        let spinner = console::pipeline_spinner(pipeline.name());
        let run = pipeline.run(PipelineContext::new()).await;
        spinner.finish_and_clear();

        for name in pipeline.stage_names() {
            let Some(outcome) = run.outcome(name) else { continue };
            if outcome.stage.starts_with("ingest_") {
                continue;
            }
            if let Some(artifact) = run.context.get(&outcome.output) {
                println!("{}", self.formatter.format_artifact(&outcome.output, artifact));
            }
        }
        println!("{}", self.formatter.format_run(&run));

        if self.save {
            let dir = ArtifactWriter::new(&self.config.paths.output_dir)
                .with_pretty_json(self.config.output.pretty_json)
                .with_timestamped_runs(self.config.output.timestamped_runs)
                .write_run(&run)?;
            println!("Artifacts saved to {}", dir.display());
        }

        match run.error() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

async fn build_model_service(config: &Config) -> Result<ModelService> {
    let gemini = Arc::new(GeminiClient::from_config(config)?);
    let embedder: Arc<dyn Embedder> = match config.llm.embedding_backend {
        EmbeddingBackend::Gemini => gemini.clone(),
        EmbeddingBackend::Model2Vec => Arc::new(EmbeddingEngine::from_config(config).await?),
    };
    let generator: Arc<dyn TextGenerator> = gemini;
    Ok(ModelService::new(generator, embedder))
}

async fn run_command(cli: Cli, config: Config, config_path: PathBuf) -> Result<()> {
    let save = !cli.no_save;

    match cli.command {
        Commands::TestConnection => {
            let model = build_model_service(&config).await?;
            println!("Testing connection to {}...", model.generator_name());
            let reply = model.try_generate("Hello! Are you ready to help me get a job?").await?;
            println!("Response: {}", reply.trim());
        }

        Commands::Ingest { file, job } => {
            let path = config.resolve_input(&file);
            let kind = if job {
                DocumentKind::JobDescription
            } else {
                DocumentKind::Resume
            };
            let document = InputManager::new().load_document(&path, kind).await?;
            println!(
                "Extracted {} words ({} characters) from {} ({})",
                document.word_count(),
                document.character_count(),
                document.source(),
                document.kind()
            );
            println!("\n--- Preview ---\n{}", cli::preview(document.content(), PREVIEW_CHARS));
        }

        Commands::AnalyzeJob { file } => {
            let app = App::load(config, save)?;
            let job = app.config.resolve_input(&file);
            app.execute(presets::analyze_job(app.services().await?, &job)).await?;
        }

        Commands::AnalyzeResume { file } => {
            let app = App::load(config, save)?;
            let resume = app.config.resolve_input(&file);
            app.execute(presets::analyze_resume(app.services().await?, &resume)).await?;
        }

        Commands::Fitment { documents } => {
            let app = App::load(config, save)?;
            let (resume, job) = app.documents(&documents);
            app.execute(presets::fitment(app.services().await?, &resume, &job)).await?;
        }

        Commands::Tailor { documents } => {
            let app = App::load(config, save)?;
            let (resume, job) = app.documents(&documents);
            app.execute(presets::tailor(app.services().await?, &resume, &job)).await?;
        }

        Commands::CoverLetter { documents, format } => {
            let app = App::load(config, save)?;
            let (resume, job) = app.documents(&documents);
            let pipeline = presets::cover_letter(app.services().await?, &resume, &job, &format);
            app.execute(pipeline).await?;
        }

        Commands::Email { job, email_type } => {
            let app = App::load(config, save)?;
            let job = app.config.resolve_input(&job);
            app.execute(presets::email(app.services().await?, &job, &email_type)).await?;
        }

        Commands::InterviewPrep { documents } => {
            let app = App::load(config, save)?;
            let (resume, job) = app.documents(&documents);
            app.execute(presets::interview_prep(app.services().await?, &resume, &job)).await?;
        }

        Commands::Run { documents, format, email_type } => {
            let app = App::load(config, save)?;
            let (resume, job) = app.documents(&documents);
            let options = ApplicationOptions {
                format_type: format,
                email_type,
            };
            let pipeline = presets::full_application(app.services().await?, &resume, &job, &options);
            app.execute(pipeline).await?;
        }

        Commands::Templates { action } => {
            let catalogue = TemplateCatalogue::load_or_builtin(&config.paths.catalogue)?;
            match action {
                TemplateAction::List => {
                    println!("Prompt templates ({}):", catalogue.len());
                    for name in catalogue.names() {
                        let template = catalogue.get(name)?;
                        println!("  {:<22} {}", name, template.description().unwrap_or(""));
                    }
                }
                TemplateAction::Show { name } => {
                    let template = catalogue.get(&name)?;
                    let placeholders: Vec<&str> =
                        template.placeholders().iter().map(String::as_str).collect();
                    println!("{}", name);
                    println!("Placeholders: {}", placeholders.join(", "));
                    println!("\n{}", template.instruction());
                }
            }
        }

        Commands::Config { action } => match action {
            Some(ConfigAction::Show) | None => show_config(&config),
            Some(ConfigAction::Reset) => {
                Config::default().save_to(&config_path)?;
                println!("Configuration reset: {}", config_path.display());
            }
            Some(ConfigAction::Path) => println!("{}", config_path.display()),
        },
    }

    Ok(())
}

fn show_config(config: &Config) {
    println!("Current Configuration\n");
    println!("Model endpoint: {}", config.llm.base_url);
    println!("Generation model: {}", config.llm.generation_model);
    println!("Embedding backend: {:?}", config.llm.embedding_backend);
    match config.llm.embedding_backend {
        EmbeddingBackend::Gemini => println!("Embedding model: {}", config.llm.embedding_model),
        EmbeddingBackend::Model2Vec => println!("Embedding model: {}", config.llm.model2vec_model),
    }
    println!("API key variable: {}", config.llm.api_key_env);
    println!("\nPaths:");
    print_path("  Input", &config.paths.input_dir);
    print_path("  Output", &config.paths.output_dir);
    print_path("  Catalogue", &config.paths.catalogue);
    println!("\nStrict placeholders: {}", config.prompts.strict_placeholders);
}

fn print_path(label: &str, path: &Path) {
    println!("{}: {}", label, path.display());
}
