pub mod assignment;
pub mod grading;
pub mod loaders;
pub mod outcome;

pub use assignment::{sanitize_name, AssignmentConfig};
pub use grading::{CompileIssues, GradingFeedback, GradingResult};
pub use loaders::{load_assignment_manifest, parse_assignment_manifest};
pub use outcome::{AssignmentReport, AssignmentStatus, StudentOutcome, StudentReport};
