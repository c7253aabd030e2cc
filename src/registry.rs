use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::model::Submission;

/// Single source of truth mapping a learner to their current submission.
///
/// Reads and writes of an individual record are atomic; multi-step
/// read-modify-write sequences take the per-learner [`guard`](Self::guard)
/// for their critical section. Records are never deleted — a reset writes
/// back a cleared submission — so the first-submission order used by the
/// review listing is stable for the lifetime of the registry.
#[derive(Default)]
pub struct SubmissionRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    records: HashMap<String, LearnerRecord>,
    order: Vec<String>,
}

struct LearnerRecord {
    gate: Arc<Mutex<()>>,
    submission: Option<Submission>,
}

impl LearnerRecord {
    fn new() -> Self {
        Self { gate: Arc::new(Mutex::new(())), submission: None }
    }
}

impl SubmissionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the mutual-exclusion scope for one learner. Operations on
    /// other learners are unaffected. The guard must not be held across
    /// calls into external collaborators.
    pub async fn guard(&self, learner_id: &str) -> OwnedMutexGuard<()> {
        let gate = {
            let mut inner = self.inner.write().await;
            inner
                .records
                .entry(learner_id.to_string())
                .or_insert_with(LearnerRecord::new)
                .gate
                .clone()
        };
        gate.lock_owned().await
    }

    pub async fn get(&self, learner_id: &str) -> Option<Submission> {
        self.inner.read().await.records.get(learner_id).and_then(|record| record.submission.clone())
    }

    /// Full replace of the learner's record.
    pub async fn put(&self, learner_id: &str, submission: Submission) {
        let mut inner = self.inner.write().await;
        let seen = inner.records.get(learner_id).is_some_and(|record| record.submission.is_some());
        if !seen {
            inner.order.push(learner_id.to_string());
        }
        inner
            .records
            .entry(learner_id.to_string())
            .or_insert_with(LearnerRecord::new)
            .submission = Some(submission);
    }

    /// Snapshot of every submission, in first-submission order.
    pub async fn list_all(&self) -> Vec<(String, Submission)> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|learner_id| {
                inner
                    .records
                    .get(learner_id)
                    .and_then(|record| record.submission.clone())
                    .map(|submission| (learner_id.clone(), submission))
            })
            .collect()
    }
}
