//! End-to-end pipeline runs against a scripted model

use job_agent::error::JobAgentError;
use job_agent::llm::{MockModel, ModelService, TemplateCatalogue};
use job_agent::pipeline::presets::{self, ApplicationOptions};
use job_agent::pipeline::stages::FitmentScore;
use job_agent::pipeline::{AbortReason, FailureKind, PipelineContext, StageServices, StageStatus};
use job_agent::processing::parser;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

const RESUME: &str = "Jane Doe\nPlatform engineer. Rust, Kubernetes, Terraform.";
const JOB: &str = "Acme is hiring a platform engineer with Rust and Kubernetes.";

struct Workspace {
    _dir: TempDir,
    resume: PathBuf,
    job: PathBuf,
}

fn workspace(resume: &str, job: &str) -> Workspace {
    let dir = TempDir::new().unwrap();
    let resume_path = dir.path().join("resume.txt");
    let job_path = dir.path().join("job.txt");
    fs::write(&resume_path, resume).unwrap();
    fs::write(&job_path, job).unwrap();
    Workspace {
        _dir: dir,
        resume: resume_path,
        job: job_path,
    }
}

fn services(mock: &Arc<MockModel>) -> Arc<StageServices> {
    let catalogue = TemplateCatalogue::builtin().unwrap();
    Arc::new(StageServices::new(
        Arc::new(catalogue),
        ModelService::from_client(Arc::clone(mock)),
    ))
}

fn fitment_of(context: &PipelineContext) -> FitmentScore {
    serde_json::from_value(context.structured("fitment").unwrap().clone()).unwrap()
}

#[tokio::test]
async fn test_identical_embeddings_score_full_match() {
    let ws = workspace(RESUME, JOB);
    let mock = Arc::new(MockModel::new());
    mock.set_embedding(RESUME, vec![1.0, 0.0]);
    mock.set_embedding(JOB, vec![1.0, 0.0]);
    mock.push_response(r#"{"strengths": ["Rust"], "recommendation": "Apply"}"#);

    let run = presets::fitment(services(&mock), &ws.resume, &ws.job)
        .run(PipelineContext::new())
        .await;

    assert!(run.is_complete());
    let score = fitment_of(&run.context);
    assert_eq!(score.match_percentage, 100.0);
    assert_eq!(score.analysis["recommendation"], "Apply");
}

#[tokio::test]
async fn test_orthogonal_embeddings_score_zero() {
    let ws = workspace(RESUME, JOB);
    let mock = Arc::new(MockModel::new());
    mock.set_embedding(RESUME, vec![1.0, 0.0]);
    mock.set_embedding(JOB, vec![0.0, 1.0]);
    mock.push_response("{}");

    let run = presets::fitment(services(&mock), &ws.resume, &ws.job)
        .run(PipelineContext::new())
        .await;

    assert_eq!(fitment_of(&run.context).match_percentage, 0.0);
}

#[tokio::test]
async fn test_opposed_embeddings_floor_at_zero() {
    let ws = workspace(RESUME, JOB);
    let mock = Arc::new(MockModel::new());
    mock.set_embedding(RESUME, vec![1.0, 0.0]);
    mock.set_embedding(JOB, vec![-1.0, 0.0]);
    mock.push_response("{}");

    let run = presets::fitment(services(&mock), &ws.resume, &ws.job)
        .run(PipelineContext::new())
        .await;

    let score = fitment_of(&run.context);
    assert_eq!(score.match_percentage, 0.0);
    assert!(score.raw_similarity < 0.0);
}

#[tokio::test]
async fn test_unparseable_job_analysis_flows_into_email_defaults() {
    let ws = workspace(RESUME, JOB);
    let mock = Arc::new(MockModel::new());
    mock.push_responses(["Sorry, I can only answer in prose.", "Hi there, I'd love to chat."]);

    let run = presets::email(services(&mock), &ws.job, "networking")
        .run(PipelineContext::new())
        .await;

    assert!(run.is_complete());
    assert!(matches!(
        run.outcome("analyze_jd").unwrap().status,
        StageStatus::Degraded { .. }
    ));
    assert_eq!(run.degraded_stages(), vec!["analyze_jd"]);

    let analysis = run.context.structured("jd_analysis").unwrap();
    assert!(parser::is_sentinel(analysis));
    assert_eq!(analysis["raw"], "Sorry, I can only answer in prose.");

    let email_prompt = &mock.prompts()[1];
    assert!(email_prompt.contains("the open role"));
    assert!(email_prompt.contains("your company"));
    assert!(email_prompt.contains("relevant technical skills"));
    assert_eq!(run.context.text("email"), Some("Hi there, I'd love to chat."));
}

#[tokio::test]
async fn test_job_analysis_fills_email_placeholders() {
    let ws = workspace(RESUME, JOB);
    let mock = Arc::new(MockModel::new());
    mock.push_responses([
        "```json\n{\"role_title\": \"Platform Engineer\", \"company_name\": \"Acme\", \"technical_skills\": [\"Rust\", \"Kubernetes\"]}\n```",
        "Dear Acme team,",
    ]);

    let run = presets::email(services(&mock), &ws.job, "application")
        .run(PipelineContext::new())
        .await;

    assert!(run.degraded_stages().is_empty());
    let email_prompt = &mock.prompts()[1];
    assert!(email_prompt.contains("Platform Engineer"));
    assert!(email_prompt.contains("Acme"));
    assert!(email_prompt.contains("Rust, Kubernetes"));
}

#[tokio::test]
async fn test_empty_resume_aborts_before_model_calls() {
    let ws = workspace("   ", JOB);
    let mock = Arc::new(MockModel::new());

    let run = presets::full_application(
        services(&mock),
        &ws.resume,
        &ws.job,
        &ApplicationOptions::default(),
    )
    .run(PipelineContext::new())
    .await;

    let abort = run.abort.as_ref().unwrap();
    assert_eq!(abort.stage, "ingest_resume");
    assert!(matches!(
        &abort.reason,
        AbortReason::Failed { failure } if failure.kind == FailureKind::Ingestion
    ));
    assert!(mock.prompts().is_empty());
    assert_eq!(run.incomplete_stages().len(), 9);
    assert!(matches!(run.error(), Some(JobAgentError::IngestionFailure { .. })));
}

#[tokio::test]
async fn test_missing_document_is_ingestion_failure() {
    let ws = workspace(RESUME, JOB);
    let mock = Arc::new(MockModel::new());

    let run = presets::tailor(services(&mock), &ws.resume.with_file_name("absent.txt"), &ws.job)
        .run(PipelineContext::new())
        .await;

    assert!(!run.is_complete());
    assert!(matches!(run.outcome("ingest_jd").unwrap().status, StageStatus::NotRun));
    assert!(run.into_result().is_err());
}

#[tokio::test]
async fn test_full_application_run() {
    let ws = workspace(RESUME, JOB);
    let mock = Arc::new(MockModel::new());
    mock.push_responses([
        r#"{"role_title": "Platform Engineer", "company_name": "Acme", "technical_skills": ["Rust"]}"#,
        r#"{"name": "Jane Doe"}"#,
        r#"{"recommendation": "Apply"}"#,
        r#"{"summary": "Platform engineer focused on Rust"}"#,
        "Dear hiring manager,",
        "Hello Acme,",
        r#"{"questions": []}"#,
    ]);

    let options = ApplicationOptions {
        format_type: "concise".to_string(),
        email_type: "application".to_string(),
    };
    let run = presets::full_application(services(&mock), &ws.resume, &ws.job, &options)
        .run(PipelineContext::new())
        .await;

    assert!(run.is_complete());
    assert!(run.degraded_stages().is_empty());
    for name in [
        "resume_text",
        "jd_text",
        "jd_analysis",
        "resume_analysis",
        "fitment",
        "tailored_resume",
        "cover_letter",
        "email",
        "interview_guide",
    ] {
        assert!(run.context.contains(name), "missing {}", name);
    }
    assert_eq!(run.context.text("cover_letter"), Some("Dear hiring manager,"));
    assert_eq!(mock.remaining_responses(), 0);
}

#[tokio::test]
async fn test_unmet_dependency_when_context_lacks_input() {
    use job_agent::pipeline::stages::TailorContentStage;
    use job_agent::pipeline::Pipeline;

    let mock = Arc::new(MockModel::new());
    let pipeline = Pipeline::new("tailor-only").stage(TailorContentStage::new(services(&mock)));

    let run = pipeline
        .run(PipelineContext::new().with("resume_text", RESUME))
        .await;

    assert_eq!(
        run.abort.as_ref().unwrap().reason,
        AbortReason::UnmetDependency {
            missing: vec!["jd_text".to_string()]
        }
    );
    assert!(mock.prompts().is_empty());
}
