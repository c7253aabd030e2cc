pub mod core;
pub mod error;
pub mod model;
pub mod registry;
pub mod review;
pub mod schemas;
pub mod services;
pub mod workflow;

#[cfg(test)]
mod test_support;

pub use crate::core::config::{ConfigError, Settings};
pub use crate::error::WorkflowError;
pub use crate::model::{
    ArtifactRef, AssignmentConfig, Grade, Provenance, Submission, SubmissionState,
};
pub use crate::registry::SubmissionRegistry;
pub use crate::review::ReviewQueue;
pub use crate::schemas::submission::{
    AssignmentUpdate, GradeOverride, SubmissionSummary, SubmissionView,
};
pub use crate::services::ai_grading::{AiGradingService, GradingOracle};
pub use crate::services::storage::{ArtifactStore, S3ArtifactStore};
pub use crate::workflow::{GradingWorkflow, UploadPolicy};
