use crate::error::WorkflowError;
use crate::model::{Grade, Provenance, SubmissionState};
use crate::schemas::submission::{AssignmentUpdate, GradeOverride};
use crate::test_support::{self, ScriptedOracle};

#[tokio::test]
async fn approve_reveals_grade_to_learner() {
    let harness = test_support::grading_harness(ScriptedOracle::grading(85.0, "Good work"), false);

    harness.workflow.submit("learner-1", b"essay text".to_vec(), "essay.pdf").await.expect("submit");
    let before = harness.workflow.learner_result("learner-1").await.expect("pending view");
    assert!(before.pending_review);
    assert_eq!(before.score, None);

    let summary = harness.workflow.approve("learner-1").await.expect("approve");
    assert_eq!(summary.state, SubmissionState::Approved);
    assert_eq!(summary.last_modified_by, Provenance::System);

    let after = harness.workflow.learner_result("learner-1").await.expect("approved view");
    assert!(!after.pending_review);
    assert_eq!(after.score, Some(85.0));
    assert_eq!(after.comment.as_deref(), Some("Good work"));
}

#[tokio::test]
async fn approve_is_idempotent() {
    let harness = test_support::grading_harness(ScriptedOracle::grading(72.5, "fine"), false);

    harness.workflow.submit("learner-1", b"essay text".to_vec(), "essay.pdf").await.expect("submit");
    let first = harness.workflow.approve("learner-1").await.expect("first approve");
    let second = harness.workflow.approve("learner-1").await.expect("second approve");

    assert_eq!(first, second);
    assert_eq!(harness.registry.get("learner-1").await.expect("stored").state, SubmissionState::Approved);
}

#[tokio::test]
async fn approve_for_unknown_learner_is_not_found() {
    let harness = test_support::grading_harness(ScriptedOracle::grading(72.5, "fine"), false);

    let result = harness.workflow.approve("nobody").await;
    assert!(matches!(result, Err(WorkflowError::NotFound(_))));
}

#[tokio::test]
async fn approve_without_grade_is_rejected() {
    let harness = test_support::grading_harness(ScriptedOracle::failing(), false);

    let _ = harness.workflow.submit("learner-1", b"essay text".to_vec(), "essay.pdf").await;
    let result = harness.workflow.approve("learner-1").await;

    assert!(matches!(result, Err(WorkflowError::Validation(_))));
    assert_eq!(
        harness.registry.get("learner-1").await.expect("stored").state,
        SubmissionState::Ungraded
    );
}

#[tokio::test]
async fn override_grade_approves_regardless_of_prior_state() {
    // Oracle down, so the submission sits in Ungraded before the override.
    let harness = test_support::grading_harness(ScriptedOracle::failing(), false);
    let _ = harness.workflow.submit("learner-1", b"essay text".to_vec(), "essay.pdf").await;

    let summary = harness
        .workflow
        .override_grade(
            "learner-1",
            GradeOverride { score: 95.0, comment: "graded by hand".to_string() },
        )
        .await
        .expect("override");

    assert_eq!(summary.state, SubmissionState::Approved);
    assert_eq!(summary.last_modified_by, Provenance::Staff);
    assert_eq!(summary.score, Some(95.0));

    let view = harness.workflow.learner_result("learner-1").await.expect("view");
    assert_eq!(view.score, Some(95.0));
    assert_eq!(view.comment.as_deref(), Some("graded by hand"));
}

#[tokio::test]
async fn override_grade_rejects_non_numeric_score() {
    let harness = test_support::grading_harness(ScriptedOracle::grading(70.0, "auto"), false);
    harness.workflow.submit("learner-1", b"essay text".to_vec(), "essay.pdf").await.expect("submit");

    let result = harness
        .workflow
        .override_grade("learner-1", GradeOverride { score: f64::NAN, comment: "?".to_string() })
        .await;

    assert!(matches!(result, Err(WorkflowError::Validation(_))));
    let stored = harness.registry.get("learner-1").await.expect("stored");
    assert_eq!(stored.grade.as_ref().expect("grade").score, 70.0);
    assert_eq!(stored.last_modified_by, Provenance::System);
}

#[tokio::test]
async fn override_grade_for_unknown_learner_is_not_found() {
    let harness = test_support::grading_harness(ScriptedOracle::grading(70.0, "auto"), false);

    let result = harness
        .workflow
        .override_grade("nobody", GradeOverride { score: 50.0, comment: "n/a".to_string() })
        .await;

    assert!(matches!(result, Err(WorkflowError::NotFound(_))));
}

#[tokio::test]
async fn reset_clears_grade_and_artifact() {
    let harness = test_support::grading_harness(ScriptedOracle::grading(85.0, "Good work"), false);
    harness.workflow.submit("learner-1", b"essay text".to_vec(), "essay.pdf").await.expect("submit");

    let summary = harness.workflow.reset("learner-1").await.expect("reset");
    assert_eq!(summary.state, SubmissionState::Ungraded);
    assert_eq!(summary.artifact, None);
    assert_eq!(summary.score, None);
    assert_eq!(summary.comment, None);

    let stored = harness.registry.get("learner-1").await.expect("stored");
    assert!(stored.grade.is_none());
    assert!(stored.artifact.is_none());
    assert_eq!(stored.last_modified_by, Provenance::System);
}

#[tokio::test]
async fn reset_for_unknown_learner_is_not_found() {
    let harness = test_support::grading_harness(ScriptedOracle::grading(85.0, "ok"), false);

    let result = harness.workflow.reset("nobody").await;
    assert!(matches!(result, Err(WorkflowError::NotFound(_))));
}

#[tokio::test]
async fn reset_then_resubmit_starts_a_fresh_cycle() {
    let oracle = ScriptedOracle::with_replies(vec![
        Ok(Grade { score: 60.0, comment: "first".to_string() }),
        Ok(Grade { score: 75.0, comment: "second".to_string() }),
    ]);
    let harness = test_support::grading_harness(oracle, false);

    harness.workflow.submit("learner-1", b"v1".to_vec(), "essay.pdf").await.expect("submit");
    harness.workflow.reset("learner-1").await.expect("reset");
    harness.workflow.submit("learner-1", b"v2".to_vec(), "essay.pdf").await.expect("resubmit");

    let stored = harness.registry.get("learner-1").await.expect("stored");
    assert_eq!(stored.grade.as_ref().expect("grade").score, 75.0);
    assert_eq!(stored.state, SubmissionState::PendingApproval);
}

#[tokio::test]
async fn update_assignment_replaces_prompt_and_weight() {
    let harness = test_support::grading_harness(ScriptedOracle::grading(85.0, "ok"), false);

    let config = harness
        .workflow
        .update_assignment(AssignmentUpdate {
            prompt: "Оцените стиль и структуру".to_string(),
            weight: 2.5,
        })
        .await
        .expect("update assignment");

    assert_eq!(config.prompt, "Оцените стиль и структуру");
    assert_eq!(config.weight, 2.5);
    assert_eq!(harness.workflow.assignment().await, config);
}

#[tokio::test]
async fn update_assignment_rejects_negative_weight() {
    let harness = test_support::grading_harness(ScriptedOracle::grading(85.0, "ok"), false);

    let result = harness
        .workflow
        .update_assignment(AssignmentUpdate { prompt: "prompt".to_string(), weight: -1.0 })
        .await;

    assert!(matches!(result, Err(WorkflowError::Validation(_))));
    assert_eq!(harness.workflow.assignment().await.prompt, test_support::TEST_PROMPT);
}

#[tokio::test]
async fn update_assignment_rejects_empty_prompt() {
    let harness = test_support::grading_harness(ScriptedOracle::grading(85.0, "ok"), false);

    let result = harness
        .workflow
        .update_assignment(AssignmentUpdate { prompt: String::new(), weight: 1.0 })
        .await;

    assert!(matches!(result, Err(WorkflowError::Validation(_))));
}

#[tokio::test]
async fn update_assignment_leaves_existing_submissions_untouched() {
    let harness = test_support::grading_harness(ScriptedOracle::grading(85.0, "Good work"), false);
    harness.workflow.submit("learner-1", b"essay text".to_vec(), "essay.pdf").await.expect("submit");
    let before = harness.registry.get("learner-1").await.expect("stored");

    harness
        .workflow
        .update_assignment(AssignmentUpdate { prompt: "новый промт".to_string(), weight: 3.0 })
        .await
        .expect("update assignment");

    assert_eq!(harness.registry.get("learner-1").await.expect("stored"), before);
}

#[tokio::test]
async fn regrade_reruns_the_oracle() {
    let oracle = ScriptedOracle::with_replies(vec![
        Ok(Grade { score: 70.0, comment: "first pass".to_string() }),
        Ok(Grade { score: 82.0, comment: "second pass".to_string() }),
    ]);
    let harness = test_support::grading_harness(oracle, false);

    harness.workflow.submit("learner-1", b"essay text".to_vec(), "essay.pdf").await.expect("submit");
    let summary = harness.workflow.regrade("learner-1").await.expect("regrade");

    assert_eq!(summary.score, Some(82.0));
    assert_eq!(summary.state, SubmissionState::PendingApproval);
    assert_eq!(summary.last_modified_by, Provenance::System);
}

#[tokio::test]
async fn regrade_refuses_staff_overridden_submission() {
    let harness = test_support::grading_harness(ScriptedOracle::grading(70.0, "auto"), false);
    harness.workflow.submit("learner-1", b"essay text".to_vec(), "essay.pdf").await.expect("submit");
    harness
        .workflow
        .override_grade("learner-1", GradeOverride { score: 95.0, comment: "manual".to_string() })
        .await
        .expect("override");

    let result = harness.workflow.regrade("learner-1").await;

    assert!(matches!(result, Err(WorkflowError::Validation(_))));
    let stored = harness.registry.get("learner-1").await.expect("stored");
    assert_eq!(stored.grade.as_ref().expect("grade").score, 95.0);
    assert_eq!(stored.last_modified_by, Provenance::Staff);
}

#[tokio::test]
async fn regrade_requires_an_artifact() {
    let harness = test_support::grading_harness(ScriptedOracle::grading(70.0, "auto"), false);
    harness.workflow.submit("learner-1", b"essay text".to_vec(), "essay.pdf").await.expect("submit");
    harness.workflow.reset("learner-1").await.expect("reset");

    let result = harness.workflow.regrade("learner-1").await;
    assert!(matches!(result, Err(WorkflowError::Validation(_))));
}
