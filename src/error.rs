use thiserror::Error;

/// Failure taxonomy of the grading workflow. Every operation reports one
/// of these to its immediate caller; nothing is retried or suppressed
/// inside the core.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),
    #[error("no submission found for learner {0}")]
    NotFound(String),
    #[error("artifact storage failed: {0}")]
    Storage(anyhow::Error),
    #[error("grading service failed: {0}")]
    Grading(anyhow::Error),
}
