use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::core::config::Settings;

/// Review lifecycle of a submission. `AutoGraded` and `Reset` are the
/// transient stops of the state machine; the values persisted between
/// operations are `Ungraded`, `PendingApproval` and `Approved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Ungraded,
    AutoGraded,
    PendingApproval,
    Approved,
    Reset,
}

/// Who produced the current score/comment pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    System,
    Staff,
}

/// Reference to a stored artifact: the display name plus a retrieval URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub file_name: String,
    pub url: String,
}

/// A score/comment pair. Kept together so a submission can never carry
/// one without the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub score: f64,
    pub comment: String,
}

/// One learner's current artifact plus its grading outcome and review state.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub artifact: Option<ArtifactRef>,
    pub grade: Option<Grade>,
    pub state: SubmissionState,
    pub last_modified_by: Provenance,
    pub submitted_at: Option<PrimitiveDateTime>,
    pub reviewed_at: Option<PrimitiveDateTime>,
}

impl Submission {
    /// A fresh upload whose grading has not completed.
    pub(crate) fn ungraded(artifact: ArtifactRef, submitted_at: PrimitiveDateTime) -> Self {
        Self {
            artifact: Some(artifact),
            grade: None,
            state: SubmissionState::Ungraded,
            last_modified_by: Provenance::System,
            submitted_at: Some(submitted_at),
            reviewed_at: None,
        }
    }

    /// The record left behind by a staff reset: the learner must re-upload.
    pub(crate) fn cleared() -> Self {
        Self {
            artifact: None,
            grade: None,
            state: SubmissionState::Ungraded,
            last_modified_by: Provenance::System,
            submitted_at: None,
            reviewed_at: None,
        }
    }

    /// Whether the score/comment must be hidden from the learner.
    pub fn grade_withheld(&self) -> bool {
        matches!(self.state, SubmissionState::Ungraded | SubmissionState::PendingApproval)
    }
}

/// Shared, staff-editable grading configuration for the assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentConfig {
    pub prompt: String,
    pub weight: f64,
    pub auto_approve: bool,
}

impl AssignmentConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let assignment = settings.assignment();
        Self {
            prompt: assignment.grading_prompt.clone(),
            weight: assignment.grading_weight,
            auto_approve: assignment.auto_approve,
        }
    }
}
