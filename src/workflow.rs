use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use validator::Validate;

use crate::core::config::Settings;
use crate::core::time::primitive_now_utc;
use crate::error::WorkflowError;
use crate::model::{AssignmentConfig, Grade, Provenance, Submission, SubmissionState};
use crate::registry::SubmissionRegistry;
use crate::schemas::submission::{
    AssignmentUpdate, GradeOverride, SubmissionSummary, SubmissionView,
};
use crate::services::ai_grading::{AiGradingService, GradingOracle};
use crate::services::storage::{ArtifactStore, S3ArtifactStore};

/// Limits applied to an uploaded artifact before it reaches storage.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_upload_bytes: u64,
    pub allowed_extensions: Vec<String>,
}

impl UploadPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_upload_bytes: settings.uploads().max_upload_size_mb * 1024 * 1024,
            allowed_extensions: settings.uploads().allowed_artifact_extensions.clone(),
        }
    }
}

/// Orchestrates the submission lifecycle: artifact ingestion, the grading
/// oracle call, and every staff review transition. The per-learner registry
/// guard is taken only around registry reads/writes, never across the
/// storage or oracle calls.
pub struct GradingWorkflow {
    registry: Arc<SubmissionRegistry>,
    storage: Arc<dyn ArtifactStore>,
    oracle: Arc<dyn GradingOracle>,
    assignment: RwLock<AssignmentConfig>,
    uploads: UploadPolicy,
}

impl GradingWorkflow {
    pub fn new(
        registry: Arc<SubmissionRegistry>,
        storage: Arc<dyn ArtifactStore>,
        oracle: Arc<dyn GradingOracle>,
        assignment: AssignmentConfig,
        uploads: UploadPolicy,
    ) -> Self {
        Self { registry, storage, oracle, assignment: RwLock::new(assignment), uploads }
    }

    /// Wire the production collaborators (S3 storage, OpenAI-compatible
    /// oracle) from the environment-driven settings.
    pub async fn from_settings(
        settings: &Settings,
        registry: Arc<SubmissionRegistry>,
    ) -> anyhow::Result<Self> {
        let storage = S3ArtifactStore::from_settings(settings)
            .await?
            .ok_or_else(|| anyhow::anyhow!("S3 storage is not configured"))?;
        let oracle = AiGradingService::from_settings(settings)?;

        Ok(Self::new(
            registry,
            Arc::new(storage),
            Arc::new(oracle),
            AssignmentConfig::from_settings(settings),
            UploadPolicy::from_settings(settings),
        ))
    }

    /// Learner upload: store the artifact, grade it, commit the outcome.
    ///
    /// A repeated submit fully supersedes the learner's previous record.
    /// When the oracle fails the artifact upload is not wasted: the
    /// submission is committed as `Ungraded` with the new artifact and the
    /// grading failure is returned to the caller.
    pub async fn submit(
        &self,
        learner_id: &str,
        file_bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<SubmissionView, WorkflowError> {
        self.validate_upload(file_name, &file_bytes)?;

        let artifact = self.storage.store(file_bytes, file_name).await.map_err(|err| {
            tracing::error!(learner_id = %learner_id, file_name = %file_name, error = %err, "Artifact upload failed");
            WorkflowError::Storage(err)
        })?;

        let (prompt, auto_approve) = {
            let assignment = self.assignment.read().await;
            (assignment.prompt.clone(), assignment.auto_approve)
        };

        let outcome = self.oracle.grade(&artifact, &prompt).await.and_then(|grade| {
            if grade.score.is_finite() {
                Ok(grade)
            } else {
                Err(anyhow::anyhow!("grading service returned a non-numeric score"))
            }
        });

        match outcome {
            Ok(grade) => {
                let state = if auto_approve {
                    SubmissionState::Approved
                } else {
                    SubmissionState::PendingApproval
                };
                let submission = Submission {
                    artifact: Some(artifact),
                    grade: Some(grade),
                    state,
                    last_modified_by: Provenance::System,
                    submitted_at: Some(primitive_now_utc()),
                    reviewed_at: None,
                };

                let _gate = self.registry.guard(learner_id).await;
                self.registry.put(learner_id, submission.clone()).await;

                metrics::counter!("grading_requests_total", "status" => "completed").increment(1);
                tracing::info!(learner_id = %learner_id, state = ?submission.state, "Submission graded");
                Ok(SubmissionView::from_submission(learner_id, &submission))
            }
            Err(err) => {
                let submission = Submission::ungraded(artifact, primitive_now_utc());

                let _gate = self.registry.guard(learner_id).await;
                self.registry.put(learner_id, submission).await;

                metrics::counter!("grading_requests_total", "status" => "failed").increment(1);
                tracing::error!(learner_id = %learner_id, error = %err, "AI grading failed; artifact kept");
                Err(WorkflowError::Grading(err))
            }
        }
    }

    /// Current learner-facing view, shaped by the visibility policy.
    pub async fn learner_result(&self, learner_id: &str) -> Result<SubmissionView, WorkflowError> {
        let submission = self
            .registry
            .get(learner_id)
            .await
            .ok_or_else(|| WorkflowError::NotFound(learner_id.to_string()))?;
        Ok(SubmissionView::from_submission(learner_id, &submission))
    }

    /// Staff approval: publish the automated grade without changing it.
    /// Succeeds as a no-op when the submission is already approved.
    pub async fn approve(&self, learner_id: &str) -> Result<SubmissionSummary, WorkflowError> {
        let _gate = self.registry.guard(learner_id).await;
        let mut submission = self
            .registry
            .get(learner_id)
            .await
            .ok_or_else(|| WorkflowError::NotFound(learner_id.to_string()))?;

        if submission.state == SubmissionState::Approved {
            return Ok(SubmissionSummary::from_submission(learner_id, &submission));
        }

        if submission.grade.is_none() {
            return Err(WorkflowError::Validation(
                "no automated grade to approve yet; use the manual grade override instead"
                    .to_string(),
            ));
        }

        submission.state = SubmissionState::Approved;
        submission.reviewed_at = Some(primitive_now_utc());
        self.registry.put(learner_id, submission.clone()).await;

        metrics::counter!("staff_reviews_total", "action" => "approve").increment(1);
        tracing::info!(learner_id = %learner_id, "Submission approved");
        Ok(SubmissionSummary::from_submission(learner_id, &submission))
    }

    /// Staff grade override: the only path where staff-entered values
    /// replace the oracle's output. Always leaves the submission approved.
    pub async fn override_grade(
        &self,
        learner_id: &str,
        payload: GradeOverride,
    ) -> Result<SubmissionSummary, WorkflowError> {
        payload.validate().map_err(|err| WorkflowError::Validation(err.to_string()))?;
        if !payload.score.is_finite() {
            return Err(WorkflowError::Validation("score must be a finite number".to_string()));
        }

        let _gate = self.registry.guard(learner_id).await;
        let mut submission = self
            .registry
            .get(learner_id)
            .await
            .ok_or_else(|| WorkflowError::NotFound(learner_id.to_string()))?;

        submission.grade = Some(Grade { score: payload.score, comment: payload.comment });
        submission.state = SubmissionState::Approved;
        submission.last_modified_by = Provenance::Staff;
        submission.reviewed_at = Some(primitive_now_utc());
        self.registry.put(learner_id, submission.clone()).await;

        metrics::counter!("staff_reviews_total", "action" => "override").increment(1);
        tracing::info!(learner_id = %learner_id, score = payload.score, "Grade overridden by staff");
        Ok(SubmissionSummary::from_submission(learner_id, &submission))
    }

    /// Staff reset: clear the artifact and grade and return the submission
    /// to its initial state. The prior artifact reference is not retained.
    pub async fn reset(&self, learner_id: &str) -> Result<SubmissionSummary, WorkflowError> {
        let _gate = self.registry.guard(learner_id).await;
        if self.registry.get(learner_id).await.is_none() {
            return Err(WorkflowError::NotFound(learner_id.to_string()));
        }

        let submission = Submission::cleared();
        self.registry.put(learner_id, submission.clone()).await;

        metrics::counter!("staff_reviews_total", "action" => "reset").increment(1);
        tracing::info!(learner_id = %learner_id, "Submission reset");
        Ok(SubmissionSummary::from_submission(learner_id, &submission))
    }

    /// Replace the assignment's prompt and weight. Existing submissions
    /// keep their scores; only future grading runs see the new prompt.
    pub async fn update_assignment(
        &self,
        payload: AssignmentUpdate,
    ) -> Result<AssignmentConfig, WorkflowError> {
        payload.validate().map_err(|err| WorkflowError::Validation(err.to_string()))?;
        if !payload.weight.is_finite() {
            return Err(WorkflowError::Validation("weight must be a finite number".to_string()));
        }

        let mut assignment = self.assignment.write().await;
        assignment.prompt = payload.prompt;
        assignment.weight = payload.weight;

        tracing::info!(weight = assignment.weight, "Assignment configuration updated");
        Ok(assignment.clone())
    }

    pub async fn assignment(&self) -> AssignmentConfig {
        self.assignment.read().await.clone()
    }

    /// Staff-triggered synchronous oracle re-run over the stored artifact.
    /// Refused when a staff override is in place: an automated pass never
    /// replaces a staff edit unless the learner re-submits.
    pub async fn regrade(&self, learner_id: &str) -> Result<SubmissionSummary, WorkflowError> {
        let artifact = {
            let _gate = self.registry.guard(learner_id).await;
            let submission = self
                .registry
                .get(learner_id)
                .await
                .ok_or_else(|| WorkflowError::NotFound(learner_id.to_string()))?;

            if submission.last_modified_by == Provenance::Staff {
                return Err(WorkflowError::Validation(
                    "a staff override is in place; reset the submission before regrading"
                        .to_string(),
                ));
            }

            submission.artifact.ok_or_else(|| {
                WorkflowError::Validation(
                    "no artifact to regrade; the learner must re-upload".to_string(),
                )
            })?
        };

        let (prompt, auto_approve) = {
            let assignment = self.assignment.read().await;
            (assignment.prompt.clone(), assignment.auto_approve)
        };

        let grade = self.oracle.grade(&artifact, &prompt).await.map_err(|err| {
            metrics::counter!("grading_requests_total", "status" => "failed").increment(1);
            tracing::error!(learner_id = %learner_id, error = %err, "Regrade failed");
            WorkflowError::Grading(err)
        })?;
        if !grade.score.is_finite() {
            return Err(WorkflowError::Grading(anyhow::anyhow!(
                "grading service returned a non-numeric score"
            )));
        }

        let _gate = self.registry.guard(learner_id).await;
        let mut submission = self
            .registry
            .get(learner_id)
            .await
            .ok_or_else(|| WorkflowError::NotFound(learner_id.to_string()))?;

        // A staff edit that landed while the oracle ran wins over the rerun.
        if submission.last_modified_by == Provenance::Staff {
            return Ok(SubmissionSummary::from_submission(learner_id, &submission));
        }

        submission.grade = Some(grade);
        submission.state = if auto_approve {
            SubmissionState::Approved
        } else {
            SubmissionState::PendingApproval
        };
        submission.last_modified_by = Provenance::System;
        submission.reviewed_at = None;
        self.registry.put(learner_id, submission.clone()).await;

        metrics::counter!("grading_requests_total", "status" => "completed").increment(1);
        tracing::info!(learner_id = %learner_id, state = ?submission.state, "Submission regraded");
        Ok(SubmissionSummary::from_submission(learner_id, &submission))
    }

    fn validate_upload(&self, file_name: &str, bytes: &[u8]) -> Result<(), WorkflowError> {
        if bytes.is_empty() {
            return Err(WorkflowError::Validation("no file content provided".to_string()));
        }

        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .ok_or_else(|| {
                WorkflowError::Validation("file must have an extension".to_string())
            })?;

        if !self.uploads.allowed_extensions.iter().any(|allowed| allowed == &extension) {
            return Err(WorkflowError::Validation(format!(
                "file extension '{extension}' is not allowed"
            )));
        }

        if bytes.len() as u64 > self.uploads.max_upload_bytes {
            return Err(WorkflowError::Validation(format!(
                "file exceeds the upload limit of {} bytes",
                self.uploads.max_upload_bytes
            )));
        }

        Ok(())
    }
}
