use std::sync::Arc;

use crucible_core::fakes::{ScoreByName, ScriptedCompletion};
use crucible_core::{CollaboratorError, PlanAuthor, PlanError, PlanGenerator};

fn plan_json(name: &str) -> String {
    format!(r#"{{"project_name": "{name}", "file_structure": {{"main.py": "entry point"}}}}"#)
}

#[tokio::test]
async fn single_draft_returns_first_valid_plan() {
    let svc = Arc::new(ScriptedCompletion::new([plan_json("solo")]));
    let planner = PlanGenerator::new(svc.clone(), Arc::new(ScoreByName::default()));

    let plan = planner.create_plan("a calculator").await.unwrap();
    assert_eq!(plan.project_name, "solo");
    assert_eq!(svc.calls(), 1);
    assert_eq!(svc.structured_flags(), vec![true]);
    assert!(svc.prompts()[0].contains("a calculator"));
}

#[tokio::test]
async fn parallel_drafts_keep_highest_score() {
    let svc = Arc::new(ScriptedCompletion::new([
        plan_json("low"),
        "not json at all".to_string(),
        plan_json("high"),
    ]));
    let scorer = Arc::new(ScoreByName::new([("low", 35.0), ("high", 92.0)]));
    let planner = PlanGenerator::new(svc, scorer).with_drafts(3);

    let plan = planner.create_plan("a calculator").await.unwrap();
    assert_eq!(plan.project_name, "high");
}

#[tokio::test]
async fn tied_scores_keep_first_seen() {
    let svc = Arc::new(ScriptedCompletion::new([plan_json("first"), plan_json("second")]));
    let scorer = Arc::new(ScoreByName::new([("first", 70.0), ("second", 70.0)]));
    let planner = PlanGenerator::new(svc, scorer).with_drafts(2);

    let plan = planner.create_plan("a calculator").await.unwrap();
    assert_eq!(plan.project_name, "first");
}

#[tokio::test]
async fn invalid_output_retries_then_fails() {
    let svc = Arc::new(ScriptedCompletion::new([
        r#"{"project_name": "x", "file_structure": {}}"#,
    ]));
    let planner = PlanGenerator::new(svc.clone(), Arc::new(ScoreByName::default()));

    let err = planner.create_plan("a calculator").await.unwrap_err();
    assert_eq!(err.reason(), "generation_failed");
    assert!(matches!(err, PlanError::GenerationFailed { attempts: 2, .. }));
    assert_eq!(svc.calls(), 2);
}

#[tokio::test]
async fn second_attempt_can_recover() {
    let svc = Arc::new(ScriptedCompletion::with_results(vec![
        Err(CollaboratorError::Unreachable("connection reset".to_string())),
        Ok(plan_json("recovered")),
    ]));
    let planner = PlanGenerator::new(svc, Arc::new(ScoreByName::default()));

    let plan = planner.create_plan("a calculator").await.unwrap();
    assert_eq!(plan.project_name, "recovered");
}
