use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::model::{ArtifactRef, Provenance, Submission, SubmissionState};

/// Learner-facing projection of a submission. While the submission is
/// awaiting review the score and comment are withheld and `pending_review`
/// is raised instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionView {
    pub learner_id: String,
    pub artifact: Option<ArtifactRef>,
    pub state: SubmissionState,
    pub pending_review: bool,
    pub score: Option<f64>,
    pub comment: Option<String>,
    pub submitted_at: Option<String>,
}

impl SubmissionView {
    pub(crate) fn from_submission(learner_id: &str, submission: &Submission) -> Self {
        let withheld = submission.grade_withheld();
        let grade = if withheld { None } else { submission.grade.as_ref() };
        Self {
            learner_id: learner_id.to_string(),
            artifact: submission.artifact.clone(),
            state: submission.state,
            pending_review: withheld,
            score: grade.map(|grade| grade.score),
            comment: grade.map(|grade| grade.comment.clone()),
            submitted_at: submission.submitted_at.map(format_primitive),
        }
    }
}

/// Staff-facing projection: everything the reviewer needs, grade included
/// regardless of visibility state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionSummary {
    pub learner_id: String,
    pub artifact: Option<ArtifactRef>,
    pub score: Option<f64>,
    pub comment: Option<String>,
    pub state: SubmissionState,
    pub last_modified_by: Provenance,
    pub submitted_at: Option<String>,
    pub reviewed_at: Option<String>,
}

impl SubmissionSummary {
    pub(crate) fn from_submission(learner_id: &str, submission: &Submission) -> Self {
        Self {
            learner_id: learner_id.to_string(),
            artifact: submission.artifact.clone(),
            score: submission.grade.as_ref().map(|grade| grade.score),
            comment: submission.grade.as_ref().map(|grade| grade.comment.clone()),
            state: submission.state,
            last_modified_by: submission.last_modified_by,
            submitted_at: submission.submitted_at.map(format_primitive),
            reviewed_at: submission.reviewed_at.map(format_primitive),
        }
    }
}

/// Staff grade override payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GradeOverride {
    #[validate(range(min = 0.0, message = "score must be a non-negative number"))]
    pub score: f64,
    pub comment: String,
}

/// Replacement values for the assignment configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AssignmentUpdate {
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub prompt: String,
    #[validate(range(min = 0.0, message = "weight must be a non-negative number"))]
    pub weight: f64,
}
