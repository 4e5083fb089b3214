//! Ready-made pipelines behind the CLI commands

use crate::input::DocumentKind;
use crate::pipeline::orchestrator::Pipeline;
use crate::pipeline::stages::{
    AnalyzeDocumentStage, DraftCoverLetterStage, DraftEmailStage, IngestStage,
    PrepareInterviewGuideStage, ScoreFitmentStage, StageServices, TailorContentStage,
};
use std::path::Path;
use std::sync::Arc;

/// Knobs for the generated documents of a full run
#[derive(Debug, Clone)]
pub struct ApplicationOptions {
    pub format_type: String,
    pub email_type: String,
}

impl Default for ApplicationOptions {
    fn default() -> Self {
        Self {
            format_type: DraftCoverLetterStage::DEFAULT_FORMAT.to_string(),
            email_type: DraftEmailStage::DEFAULT_EMAIL_TYPE.to_string(),
        }
    }
}

fn with_documents(name: &str, resume: &Path, job: &Path) -> Pipeline {
    Pipeline::new(name)
        .stage(IngestStage::new(DocumentKind::Resume, resume))
        .stage(IngestStage::new(DocumentKind::JobDescription, job))
}

pub fn analyze_job(services: Arc<StageServices>, job: &Path) -> Pipeline {
    Pipeline::new("analyze-job")
        .stage(IngestStage::new(DocumentKind::JobDescription, job))
        .stage(AnalyzeDocumentStage::new(DocumentKind::JobDescription, services))
}

pub fn analyze_resume(services: Arc<StageServices>, resume: &Path) -> Pipeline {
    Pipeline::new("analyze-resume")
        .stage(IngestStage::new(DocumentKind::Resume, resume))
        .stage(AnalyzeDocumentStage::new(DocumentKind::Resume, services))
}

pub fn fitment(services: Arc<StageServices>, resume: &Path, job: &Path) -> Pipeline {
    with_documents("fitment", resume, job).stage(ScoreFitmentStage::new(services))
}

pub fn tailor(services: Arc<StageServices>, resume: &Path, job: &Path) -> Pipeline {
    with_documents("tailor", resume, job).stage(TailorContentStage::new(services))
}

pub fn cover_letter(
    services: Arc<StageServices>,
    resume: &Path,
    job: &Path,
    format_type: &str,
) -> Pipeline {
    with_documents("cover-letter", resume, job)
        .stage(DraftCoverLetterStage::with_format(services, format_type))
}

pub fn email(services: Arc<StageServices>, job: &Path, email_type: &str) -> Pipeline {
    Pipeline::new("email")
        .stage(IngestStage::new(DocumentKind::JobDescription, job))
        .stage(AnalyzeDocumentStage::new(
            DocumentKind::JobDescription,
            Arc::clone(&services),
        ))
        .stage(DraftEmailStage::new(services, email_type))
}

pub fn interview_prep(services: Arc<StageServices>, resume: &Path, job: &Path) -> Pipeline {
    with_documents("interview-prep", resume, job).stage(PrepareInterviewGuideStage::new(services))
}

/// Every stage, from ingestion to the interview guide
pub fn full_application(
    services: Arc<StageServices>,
    resume: &Path,
    job: &Path,
    options: &ApplicationOptions,
) -> Pipeline {
    with_documents("full-application", resume, job)
        .stage(AnalyzeDocumentStage::new(
            DocumentKind::JobDescription,
            Arc::clone(&services),
        ))
        .stage(AnalyzeDocumentStage::new(DocumentKind::Resume, Arc::clone(&services)))
        .stage(ScoreFitmentStage::new(Arc::clone(&services)))
        .stage(TailorContentStage::new(Arc::clone(&services)))
        .stage(DraftCoverLetterStage::with_format(
            Arc::clone(&services),
            options.format_type.as_str(),
        ))
        .stage(DraftEmailStage::new(Arc::clone(&services), options.email_type.as_str()))
        .stage(PrepareInterviewGuideStage::new(services))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::ModelService;
    use crate::llm::mock::MockModel;
    use crate::llm::prompts::TemplateCatalogue;

    fn services() -> (Arc<StageServices>, TemplateCatalogue) {
        let catalogue = TemplateCatalogue::builtin().unwrap();
        let services = StageServices::new(
            Arc::new(catalogue.clone()),
            ModelService::from_client(Arc::new(MockModel::new())),
        );
        (Arc::new(services), catalogue)
    }

    #[test]
    fn test_every_preset_validates_against_builtin_catalogue() {
        let (services, catalogue) = services();
        let resume = Path::new("resume.txt");
        let job = Path::new("job.txt");

        let pipelines = vec![
            analyze_job(Arc::clone(&services), job),
            analyze_resume(Arc::clone(&services), resume),
            fitment(Arc::clone(&services), resume, job),
            tailor(Arc::clone(&services), resume, job),
            cover_letter(Arc::clone(&services), resume, job, "standard"),
            email(Arc::clone(&services), job, "networking"),
            interview_prep(Arc::clone(&services), resume, job),
            full_application(services, resume, job, &ApplicationOptions::default()),
        ];

        for pipeline in &pipelines {
            assert!(pipeline.validate(&catalogue).is_ok(), "{} failed validation", pipeline.name());
        }
    }

    #[test]
    fn test_full_application_stage_order() {
        let (services, _) = services();
        let pipeline = full_application(
            services,
            Path::new("r.txt"),
            Path::new("j.txt"),
            &ApplicationOptions::default(),
        );

        assert_eq!(
            pipeline.stage_names(),
            vec![
                "ingest_resume",
                "ingest_jd",
                "analyze_jd",
                "analyze_resume",
                "score_fitment",
                "tailor_content",
                "draft_cover_letter",
                "draft_email",
                "prepare_interview_guide",
            ]
        );
    }
}
