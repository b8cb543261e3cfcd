pub mod grading_service;
pub mod revision_resolver;
pub mod rubric_registry;
pub mod submission_source;

pub use grading_service::{GradingService, OpenAiGrader};
pub use revision_resolver::{parse_revision_number, RevisionResolver};
pub use rubric_registry::{registered_rubrics, resolve_rubric, AssignmentPrompt};
pub use submission_source::{
    extract_archive, HttpSubmissionSource, ManualUploadSource, SubmissionSource,
};
