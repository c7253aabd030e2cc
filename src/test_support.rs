use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::model::{ArtifactRef, AssignmentConfig, Grade};
use crate::registry::SubmissionRegistry;
use crate::review::ReviewQueue;
use crate::services::ai_grading::GradingOracle;
use crate::services::storage::ArtifactStore;
use crate::workflow::{GradingWorkflow, UploadPolicy};

pub(crate) const TEST_PROMPT: &str =
    "Проверьте работу и верните строгий JSON с ключами score и comment.";

/// In-memory artifact store; every upload gets a distinct retrieval URL so
/// replace semantics are observable.
pub(crate) struct MemoryArtifactStore {
    uploads: Mutex<Vec<String>>,
}

impl MemoryArtifactStore {
    pub(crate) fn new() -> Self {
        Self { uploads: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn store(&self, _bytes: Vec<u8>, file_name: &str) -> anyhow::Result<ArtifactRef> {
        let mut uploads = self.uploads.lock().expect("uploads lock");
        uploads.push(file_name.to_string());
        let url = format!("memory://artifacts/{}/{file_name}", uploads.len());
        Ok(ArtifactRef { file_name: file_name.to_string(), url })
    }
}

pub(crate) struct FailingArtifactStore;

#[async_trait]
impl ArtifactStore for FailingArtifactStore {
    async fn store(&self, _bytes: Vec<u8>, _file_name: &str) -> anyhow::Result<ArtifactRef> {
        Err(anyhow::anyhow!("object storage unavailable"))
    }
}

/// Oracle that serves a scripted sequence of replies, one per grading call.
pub(crate) struct ScriptedOracle {
    replies: Mutex<VecDeque<anyhow::Result<Grade>>>,
}

impl ScriptedOracle {
    pub(crate) fn with_replies(replies: Vec<anyhow::Result<Grade>>) -> Self {
        Self { replies: Mutex::new(replies.into_iter().collect()) }
    }

    pub(crate) fn grading(score: f64, comment: &str) -> Self {
        Self::with_replies(vec![Ok(Grade { score, comment: comment.to_string() })])
    }

    pub(crate) fn failing() -> Self {
        Self::with_replies(vec![Err(anyhow::anyhow!("grading backend is down"))])
    }
}

#[async_trait]
impl GradingOracle for ScriptedOracle {
    async fn grade(&self, _artifact: &ArtifactRef, _prompt: &str) -> anyhow::Result<Grade> {
        self.replies.lock().expect("replies lock").pop_front().expect("scripted oracle exhausted")
    }
}

pub(crate) struct TestHarness {
    pub(crate) registry: Arc<SubmissionRegistry>,
    pub(crate) workflow: Arc<GradingWorkflow>,
    pub(crate) queue: ReviewQueue,
}

pub(crate) fn grading_harness(oracle: ScriptedOracle, auto_approve: bool) -> TestHarness {
    harness_with_store(MemoryArtifactStore::new(), oracle, auto_approve)
}

pub(crate) fn harness_with_store(
    store: impl ArtifactStore + 'static,
    oracle: ScriptedOracle,
    auto_approve: bool,
) -> TestHarness {
    let registry = Arc::new(SubmissionRegistry::new());
    let workflow = GradingWorkflow::new(
        registry.clone(),
        Arc::new(store),
        Arc::new(oracle),
        AssignmentConfig { prompt: TEST_PROMPT.to_string(), weight: 1.0, auto_approve },
        UploadPolicy {
            max_upload_bytes: 10 * 1024 * 1024,
            allowed_extensions: vec!["pdf".to_string(), "docx".to_string()],
        },
    );
    let queue = ReviewQueue::new(registry.clone());

    TestHarness { registry, workflow: Arc::new(workflow), queue }
}
