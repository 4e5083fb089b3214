//! Concrete stages of the job application pipeline

use crate::input::{Document, DocumentKind, InputManager};
use crate::llm::client::ModelService;
use crate::llm::prompts::{PromptParams, TemplateCatalogue};
use crate::pipeline::artifacts::{
    COVER_LETTER, EMAIL, FITMENT, INTERVIEW_GUIDE, JD_ANALYSIS, JD_TEXT, RESUME_TEXT,
    TAILORED_RESUME,
};
use crate::pipeline::context::{Artifact, PipelineContext};
use crate::pipeline::stage::{Stage, StageFailure, StageResult};
use crate::processing::parser::{self, ParsedResponse};
use crate::processing::similarity::{cosine_similarity, fitment_percentage};
use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

const FITMENT_TEMPLATE: &str = "fitment_analyzer";
const TAILOR_TEMPLATE: &str = "resume_tailor";
const COVER_LETTER_TEMPLATE: &str = "cover_letter_writer";
const EMAIL_TEMPLATE: &str = "email_generator";
const INTERVIEW_TEMPLATE: &str = "interview_coach";

const BOTH_TEXTS: [&str; 2] = [RESUME_TEXT, JD_TEXT];

/// Dependencies shared by every model-backed stage
#[derive(Debug, Clone)]
pub struct StageServices {
    catalogue: Arc<TemplateCatalogue>,
    model: ModelService,
    strict_placeholders: bool,
}

impl StageServices {
    pub fn new(catalogue: Arc<TemplateCatalogue>, model: ModelService) -> Self {
        Self {
            catalogue,
            model,
            strict_placeholders: false,
        }
    }

    pub fn with_strict_placeholders(mut self, strict: bool) -> Self {
        self.strict_placeholders = strict;
        self
    }

    pub fn catalogue(&self) -> &TemplateCatalogue {
        &self.catalogue
    }

    pub fn model(&self) -> &ModelService {
        &self.model
    }

    /// Render a catalogue template into a concrete prompt
    pub fn prompt(&self, template: &str, params: &PromptParams) -> Result<String, StageFailure> {
        let template = self
            .catalogue
            .get(template)
            .map_err(|e| StageFailure::configuration(e.to_string()))?;

        if self.strict_placeholders {
            template
                .render_strict(params)
                .map_err(|e| StageFailure::configuration(e.to_string()))
        } else {
            Ok(template.render(params))
        }
    }

    /// Prompt the model and keep its answer as text
    pub async fn generate_text(&self, template: &str, params: &PromptParams) -> StageResult {
        let prompt = self.prompt(template, params)?;
        Ok(Artifact::Text(self.model.generate(&prompt).await))
    }

    /// Prompt the model and parse its answer as structured data
    pub async fn generate_structured(&self, template: &str, params: &PromptParams) -> StageResult {
        let prompt = self.prompt(template, params)?;
        let response = self.model.generate(&prompt).await;
        match parser::parse(&response) {
            ParsedResponse::Structured(value) => Ok(Artifact::Structured(value)),
            ParsedResponse::Failure(failure) => Err(StageFailure::parse(failure)),
        }
    }
}

/// Text artifact that the dependency check guarantees is present
fn required_text<'a>(context: &'a PipelineContext, name: &str) -> Result<&'a str, StageFailure> {
    context.text(name).ok_or_else(|| {
        StageFailure::configuration(format!("artifact '{}' is not a text artifact", name))
    })
}

fn document_pair_params(context: &PipelineContext) -> Result<PromptParams, StageFailure> {
    Ok(PromptParams::new()
        .with(RESUME_TEXT, required_text(context, RESUME_TEXT)?)
        .with(JD_TEXT, required_text(context, JD_TEXT)?))
}

/// Read a source document into the context
pub struct IngestStage {
    name: String,
    kind: DocumentKind,
    path: PathBuf,
}

impl IngestStage {
    pub fn new(kind: DocumentKind, path: impl Into<PathBuf>) -> Self {
        let name = match kind {
            DocumentKind::Resume => "ingest_resume",
            DocumentKind::JobDescription => "ingest_jd",
        };
        Self {
            name: name.to_string(),
            kind,
            path: path.into(),
        }
    }
}

#[async_trait]
impl Stage for IngestStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> &[&str] {
        &[]
    }

    fn writes(&self) -> &str {
        self.kind.text_artifact()
    }

    async fn run(&self, _context: &PipelineContext) -> StageResult {
        let text = InputManager::new().ingest(&self.path).await;

        let document = Document::new(text, self.path.display().to_string(), self.kind);
        if document.is_empty() {
            return Err(StageFailure::ingestion(format!(
                "no text could be extracted from {} ({})",
                document.source(),
                self.kind
            )));
        }

        info!(
            "Read {} words ({} characters) from {}",
            document.word_count(),
            document.character_count(),
            document.source()
        );
        Ok(Artifact::Text(document.into_content()))
    }
}

/// Extract structured fields from a resume or job description
pub struct AnalyzeDocumentStage {
    name: String,
    kind: DocumentKind,
    reads: [&'static str; 1],
    services: Arc<StageServices>,
}

impl AnalyzeDocumentStage {
    pub fn new(kind: DocumentKind, services: Arc<StageServices>) -> Self {
        let name = match kind {
            DocumentKind::Resume => "analyze_resume",
            DocumentKind::JobDescription => "analyze_jd",
        };
        Self {
            name: name.to_string(),
            kind,
            reads: [kind.text_artifact()],
            services,
        }
    }
}

#[async_trait]
impl Stage for AnalyzeDocumentStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> &[&str] {
        &self.reads
    }

    fn writes(&self) -> &str {
        self.kind.analysis_artifact()
    }

    fn template(&self) -> Option<&str> {
        Some(self.kind.analyzer_template())
    }

    async fn run(&self, context: &PipelineContext) -> StageResult {
        info!("Analyzing {}...", self.kind);
        let source = self.kind.text_artifact();
        let params = PromptParams::new().with(source, required_text(context, source)?);
        self.services
            .generate_structured(self.kind.analyzer_template(), &params)
            .await
    }
}

/// Semantic score plus the model's qualitative judgment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitmentScore {
    /// Cosine similarity rescaled to `[0, 100]`, two decimals
    pub match_percentage: f64,
    /// Unclamped cosine similarity in `[-1, 1]`
    pub raw_similarity: f32,
    /// False when the two embeddings could not be compared
    pub semantic_available: bool,
    pub analysis: Value,
}

impl FitmentScore {
    pub fn from_embeddings(resume: &[f32], job: &[f32], analysis: Value) -> Self {
        let raw_similarity = cosine_similarity(resume, job);
        Self {
            match_percentage: fitment_percentage(raw_similarity),
            raw_similarity,
            semantic_available: !resume.is_empty() && resume.len() == job.len(),
            analysis,
        }
    }

    pub fn analysis_available(&self) -> bool {
        !parser::is_sentinel(&self.analysis)
    }
}

pub struct ScoreFitmentStage {
    services: Arc<StageServices>,
}

impl ScoreFitmentStage {
    pub fn new(services: Arc<StageServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Stage for ScoreFitmentStage {
    fn name(&self) -> &str {
        "score_fitment"
    }

    fn reads(&self) -> &[&str] {
        &BOTH_TEXTS
    }

    fn writes(&self) -> &str {
        FITMENT
    }

    fn template(&self) -> Option<&str> {
        Some(FITMENT_TEMPLATE)
    }

    async fn run(&self, context: &PipelineContext) -> StageResult {
        info!("Calculating fitment...");
        let resume_text = required_text(context, RESUME_TEXT)?;
        let jd_text = required_text(context, JD_TEXT)?;

        let model = self.services.model();
        let (resume_vec, jd_vec) = tokio::join!(model.embed(resume_text), model.embed(jd_text));
        if resume_vec.is_empty() || jd_vec.is_empty() {
            warn!("Embeddings unavailable, semantic score falls back to 0%");
        }

        let params = document_pair_params(context)?;
        let analysis = match self.services.generate_structured(FITMENT_TEMPLATE, &params).await {
            Ok(artifact) => artifact.as_structured().cloned().unwrap_or(Value::Null),
            Err(failure) => match failure.degraded_artifact() {
                Some(Artifact::Structured(sentinel)) => sentinel,
                _ => return Err(failure),
            },
        };

        let score = FitmentScore::from_embeddings(&resume_vec, &jd_vec, analysis);
        info!("Semantic match: {:.2}%", score.match_percentage);
        let value = serde_json::to_value(&score)
            .map_err(|e| StageFailure::configuration(format!("cannot serialize fitment: {}", e)))?;
        Ok(Artifact::Structured(value))
    }
}

/// Rewrite resume content towards the job description
pub struct TailorContentStage {
    services: Arc<StageServices>,
}

impl TailorContentStage {
    pub fn new(services: Arc<StageServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Stage for TailorContentStage {
    fn name(&self) -> &str {
        "tailor_content"
    }

    fn reads(&self) -> &[&str] {
        &BOTH_TEXTS
    }

    fn writes(&self) -> &str {
        TAILORED_RESUME
    }

    fn template(&self) -> Option<&str> {
        Some(TAILOR_TEMPLATE)
    }

    async fn run(&self, context: &PipelineContext) -> StageResult {
        info!("Tailoring resume content...");
        let params = document_pair_params(context)?;
        self.services.generate_structured(TAILOR_TEMPLATE, &params).await
    }
}

pub struct DraftCoverLetterStage {
    format_type: String,
    services: Arc<StageServices>,
}

impl DraftCoverLetterStage {
    pub const DEFAULT_FORMAT: &'static str = "standard";

    pub fn new(services: Arc<StageServices>) -> Self {
        Self::with_format(services, Self::DEFAULT_FORMAT)
    }

    pub fn with_format(services: Arc<StageServices>, format_type: impl Into<String>) -> Self {
        Self {
            format_type: format_type.into(),
            services,
        }
    }
}

#[async_trait]
impl Stage for DraftCoverLetterStage {
    fn name(&self) -> &str {
        "draft_cover_letter"
    }

    fn reads(&self) -> &[&str] {
        &BOTH_TEXTS
    }

    fn writes(&self) -> &str {
        COVER_LETTER
    }

    fn template(&self) -> Option<&str> {
        Some(COVER_LETTER_TEMPLATE)
    }

    async fn run(&self, context: &PipelineContext) -> StageResult {
        info!("Writing cover letter ({})...", self.format_type);
        let params = document_pair_params(context)?.with("format_type", self.format_type.as_str());
        self.services.generate_text(COVER_LETTER_TEMPLATE, &params).await
    }
}

/// Networking or application email built from the job analysis
pub struct DraftEmailStage {
    email_type: String,
    services: Arc<StageServices>,
}

impl DraftEmailStage {
    pub const DEFAULT_EMAIL_TYPE: &'static str = "application";

    pub fn new(services: Arc<StageServices>, email_type: impl Into<String>) -> Self {
        Self {
            email_type: email_type.into(),
            services,
        }
    }

    /// Placeholder values taken from a job analysis, with defaults for
    /// anything missing (including a failed-parse sentinel)
    pub fn email_params(&self, job_details: &Value) -> PromptParams {
        let role = job_details
            .get("role_title")
            .and_then(Value::as_str)
            .unwrap_or("the open role");
        let company = job_details
            .get("company_name")
            .and_then(Value::as_str)
            .unwrap_or("your company");

        let skills: Vec<&str> = job_details
            .get("technical_skills")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).take(3).collect())
            .unwrap_or_default();
        let skills = if skills.is_empty() {
            "relevant technical skills".to_string()
        } else {
            skills.join(", ")
        };

        PromptParams::new()
            .with("email_type", self.email_type.as_str())
            .with("role_name", role)
            .with("company_name", company)
            .with("key_skills", skills)
    }
}

#[async_trait]
impl Stage for DraftEmailStage {
    fn name(&self) -> &str {
        "draft_email"
    }

    fn reads(&self) -> &[&str] {
        &[JD_ANALYSIS]
    }

    fn writes(&self) -> &str {
        EMAIL
    }

    fn template(&self) -> Option<&str> {
        Some(EMAIL_TEMPLATE)
    }

    async fn run(&self, context: &PipelineContext) -> StageResult {
        info!("Writing email ({})...", self.email_type);
        let job_details = context.structured(JD_ANALYSIS).cloned().unwrap_or(Value::Null);
        let params = self.email_params(&job_details);
        self.services.generate_text(EMAIL_TEMPLATE, &params).await
    }
}

/// Predicted interview questions with suggested answers
pub struct PrepareInterviewGuideStage {
    services: Arc<StageServices>,
}

impl PrepareInterviewGuideStage {
    pub fn new(services: Arc<StageServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Stage for PrepareInterviewGuideStage {
    fn name(&self) -> &str {
        "prepare_interview_guide"
    }

    fn reads(&self) -> &[&str] {
        &BOTH_TEXTS
    }

    fn writes(&self) -> &str {
        INTERVIEW_GUIDE
    }

    fn template(&self) -> Option<&str> {
        Some(INTERVIEW_TEMPLATE)
    }

    async fn run(&self, context: &PipelineContext) -> StageResult {
        info!("Preparing interview questions...");
        let params = document_pair_params(context)?;
        self.services.generate_structured(INTERVIEW_TEMPLATE, &params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockModel;
    use crate::llm::prompts::PromptTemplate;
    use crate::pipeline::stage::FailureKind;
    use serde_json::json;

    fn services(mock: Arc<MockModel>) -> Arc<StageServices> {
        let catalogue = TemplateCatalogue::builtin().unwrap();
        Arc::new(StageServices::new(Arc::new(catalogue), ModelService::from_client(mock)))
    }

    fn documents() -> PipelineContext {
        PipelineContext::new()
            .with(RESUME_TEXT, "Jane Doe. Rust, Kafka, Postgres.")
            .with(JD_TEXT, "Acme needs a backend engineer with Rust.")
    }

    #[tokio::test]
    async fn test_analyze_document_parses_fenced_json() {
        let mock = Arc::new(MockModel::new());
        mock.push_response("```json\n{\"role_title\": \"Backend Engineer\"}\n```");
        let stage = AnalyzeDocumentStage::new(DocumentKind::JobDescription, services(mock.clone()));

        let artifact = stage.run(&documents()).await.unwrap();

        assert_eq!(artifact, Artifact::Structured(json!({"role_title": "Backend Engineer"})));
        assert!(mock.prompts()[0].contains("Acme needs a backend engineer with Rust."));
        assert_eq!(stage.reads(), &["jd_text"]);
        assert_eq!(stage.writes(), "jd_analysis");
    }

    #[tokio::test]
    async fn test_analyze_document_reports_parse_failure() {
        let mock = Arc::new(MockModel::new());
        mock.push_response("I could not read that resume.");
        let stage = AnalyzeDocumentStage::new(DocumentKind::Resume, services(mock));

        let failure = stage.run(&documents()).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Parse);
        assert_eq!(failure.raw.as_deref(), Some("I could not read that resume."));
    }

    #[tokio::test]
    async fn test_fitment_combines_similarity_and_analysis() {
        let mock = Arc::new(MockModel::new());
        mock.set_embedding("Jane Doe. Rust, Kafka, Postgres.", vec![1.0, 0.0]);
        mock.set_embedding("Acme needs a backend engineer with Rust.", vec![1.0, 0.0]);
        mock.push_response(r#"{"recommendation": "strong fit"}"#);
        let stage = ScoreFitmentStage::new(services(mock));

        let artifact = stage.run(&documents()).await.unwrap();
        let score: FitmentScore = serde_json::from_value(artifact.as_structured().unwrap().clone()).unwrap();

        assert_eq!(score.match_percentage, 100.0);
        assert!(score.semantic_available);
        assert_eq!(score.analysis, json!({"recommendation": "strong fit"}));
    }

    #[tokio::test]
    async fn test_fitment_with_unparseable_analysis_keeps_sentinel() {
        let mock = Arc::new(MockModel::new());
        mock.set_embedding("Jane Doe. Rust, Kafka, Postgres.", vec![1.0, 0.0]);
        mock.set_embedding("Acme needs a backend engineer with Rust.", vec![0.0, 1.0]);
        mock.push_response("Looks like a decent fit overall!");
        let stage = ScoreFitmentStage::new(services(mock));

        let artifact = stage.run(&documents()).await.unwrap();
        let score: FitmentScore = serde_json::from_value(artifact.as_structured().unwrap().clone()).unwrap();

        assert_eq!(score.match_percentage, 0.0);
        assert!(!score.analysis_available());
        assert_eq!(score.analysis["raw"], "Looks like a decent fit overall!");
    }

    #[tokio::test]
    async fn test_fitment_without_embeddings_scores_zero() {
        let mock = Arc::new(MockModel::new().with_embedding_failure("embedding service down"));
        mock.push_response("{}");
        let stage = ScoreFitmentStage::new(services(mock));

        let artifact = stage.run(&documents()).await.unwrap();
        let score: FitmentScore = serde_json::from_value(artifact.as_structured().unwrap().clone()).unwrap();

        assert_eq!(score.match_percentage, 0.0);
        assert_eq!(score.raw_similarity, 0.0);
        assert!(!score.semantic_available);
    }

    #[test]
    fn test_mismatched_dimensions_are_not_comparable() {
        let score = FitmentScore::from_embeddings(&[1.0, 0.0], &[1.0, 0.0, 0.0], json!({}));
        assert_eq!(score.match_percentage, 0.0);
        assert!(!score.semantic_available);

        let score = FitmentScore::from_embeddings(&[0.6, 0.8], &[0.6, 0.8], json!({}));
        assert!(score.semantic_available);
    }

    #[tokio::test]
    async fn test_negative_similarity_is_floored_but_recorded() {
        let score = FitmentScore::from_embeddings(&[1.0, 0.0], &[-1.0, 0.0], json!({}));
        assert_eq!(score.match_percentage, 0.0);
        assert!((score.raw_similarity + 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_cover_letter_uses_format_type() {
        let mock = Arc::new(MockModel::new());
        mock.push_response("Dear hiring team,");
        let stage = DraftCoverLetterStage::with_format(services(mock.clone()), "concise");

        let artifact = stage.run(&documents()).await.unwrap();

        assert_eq!(artifact, Artifact::Text("Dear hiring team,".to_string()));
        assert!(mock.prompts()[0].contains("Write a concise cover letter"));
    }

    #[tokio::test]
    async fn test_generation_failure_is_inlined_into_text_artifact() {
        let mock = Arc::new(MockModel::new());
        mock.push_failure("deadline exceeded");
        let stage = DraftCoverLetterStage::new(services(mock));

        let artifact = stage.run(&documents()).await.unwrap();
        assert!(artifact.as_text().unwrap().starts_with("Error: Could not generate content."));
    }

    #[test]
    fn test_email_params_from_analysis() {
        let stage = DraftEmailStage::new(services(Arc::new(MockModel::new())), "networking");
        let params = stage.email_params(&json!({
            "role_title": "Platform Engineer",
            "company_name": "Acme",
            "technical_skills": ["Rust", "Kubernetes", "Terraform", "Go"]
        }));

        assert_eq!(params.get("email_type"), Some("networking"));
        assert_eq!(params.get("role_name"), Some("Platform Engineer"));
        assert_eq!(params.get("company_name"), Some("Acme"));
        assert_eq!(params.get("key_skills"), Some("Rust, Kubernetes, Terraform"));
    }

    #[test]
    fn test_email_params_defaults_for_sentinel() {
        let stage = DraftEmailStage::new(services(Arc::new(MockModel::new())), "application");
        let params = stage.email_params(&parser::parse_or_sentinel("garbage"));

        assert_eq!(params.get("role_name"), Some("the open role"));
        assert_eq!(params.get("company_name"), Some("your company"));
        assert_eq!(params.get("key_skills"), Some("relevant technical skills"));
    }

    #[tokio::test]
    async fn test_strict_placeholders_abort_on_missing_value() {
        let mut catalogue = TemplateCatalogue::default();
        catalogue.insert(PromptTemplate::new("cover_letter_writer", "{resume_text} {jd_text} {tone}"));
        let services = Arc::new(
            StageServices::new(Arc::new(catalogue), ModelService::from_client(Arc::new(MockModel::new())))
                .with_strict_placeholders(true),
        );
        let stage = DraftCoverLetterStage::new(services);

        let failure = stage.run(&documents()).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Configuration);
        assert!(failure.message.contains("{tone}"));
    }

    #[tokio::test]
    async fn test_ingest_empty_file_fails_ingestion() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("resume.txt");
        std::fs::write(&path, "   \n").unwrap();

        let failure = IngestStage::new(DocumentKind::Resume, &path)
            .run(&PipelineContext::new())
            .await
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::Ingestion);
    }
}
