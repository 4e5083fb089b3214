//! Names of the artifacts stages exchange through the context

pub const RESUME_TEXT: &str = "resume_text";
pub const JD_TEXT: &str = "jd_text";
pub const RESUME_ANALYSIS: &str = "resume_analysis";
pub const JD_ANALYSIS: &str = "jd_analysis";
pub const FITMENT: &str = "fitment";
pub const TAILORED_RESUME: &str = "tailored_resume";
pub const COVER_LETTER: &str = "cover_letter";
pub const EMAIL: &str = "email";
pub const INTERVIEW_GUIDE: &str = "interview_guide";
