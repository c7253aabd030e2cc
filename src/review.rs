use std::sync::Arc;

use crate::model::SubmissionState;
use crate::registry::SubmissionRegistry;
use crate::schemas::submission::SubmissionSummary;

/// Read-only staff view over the registry: one summary per learner who has
/// ever submitted, in first-submission order. Reads hit the registry
/// directly, so the listing always reflects the immediately preceding
/// mutation.
pub struct ReviewQueue {
    registry: Arc<SubmissionRegistry>,
}

impl ReviewQueue {
    pub fn new(registry: Arc<SubmissionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn list(&self) -> Vec<SubmissionSummary> {
        self.registry
            .list_all()
            .await
            .iter()
            .map(|(learner_id, submission)| {
                SubmissionSummary::from_submission(learner_id, submission)
            })
            .collect()
    }

    /// The listing narrowed to one lifecycle state, e.g. everything still
    /// awaiting a reviewer.
    pub async fn list_by_state(&self, state: SubmissionState) -> Vec<SubmissionSummary> {
        self.list().await.into_iter().filter(|summary| summary.state == state).collect()
    }
}
