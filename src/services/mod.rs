pub mod export_service;
pub mod progress;
pub mod submission_service;

pub use export_service::{ExportFiles, ResultExporter};
pub use progress::ProgressReporter;
pub use submission_service::{RetryPolicy, SubmissionService};
