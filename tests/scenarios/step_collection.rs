//! Test: Step Collection
//!
//! - Steps, step groups and parallel blocks flatten in document order
//! - Identifier index agrees with every collected path
//! - Original counterparts are matched by identifier

use crate::helpers::*;
use pipeline_inspect::core::PathAddress;
use pipeline_inspect::resolve::{collect_steps, Divergence};

#[test]
fn test_fixture_steps_in_document_order() {
    let original = original_pipeline();
    let resolved = resolved_pipeline();
    let execution = resolved.pipeline.find_stage("asd").unwrap().execution().unwrap();
    let original_execution = original.pipeline.find_stage("asd").unwrap().execution();

    let collection = collect_steps(execution, original_execution, &PathAddress::stage("asd"));

    let collected: Vec<_> = collection
        .steps
        .iter()
        .map(|s| (s.identifier(), s.path.as_str()))
        .collect();
    assert_eq!(
        collected,
        vec![
            ("step1", "steps[0]"),
            ("step1_1", "steps[1].stepGroup.steps[0]"),
            ("undo", "steps[1].stepGroup.rollbackSteps[0]"),
            ("rollback", "rollbackSteps[0]"),
        ]
    );
    assert!(collection.is_consistent());
}

#[test]
fn test_step_count_matches_document() {
    let resolved = resolved_pipeline();
    for stage in resolved.pipeline.stages_flat() {
        let execution = stage.execution().unwrap();
        let collection = collect_steps(execution, None, &PathAddress::stage(stage.identifier()));
        assert_eq!(collection.len(), execution.step_count());
    }
}

#[test]
fn test_identifier_index_matches_paths() {
    let resolved = resolved_pipeline();
    let execution = resolved.pipeline.find_stage("asd").unwrap().execution().unwrap();
    let collection = collect_steps(execution, None, &PathAddress::stage("asd"));
    for step in &collection.steps {
        assert_eq!(collection.identifier_index[step.identifier()], step.path);
    }
}

#[test]
fn test_same_display_name_distinct_addresses() {
    let resolved = resolved_pipeline();
    let execution = resolved.pipeline.find_stage("asd").unwrap().execution().unwrap();
    let collection = collect_steps(execution, None, &PathAddress::stage("asd"));

    let step1 = collection.find("step1").unwrap();
    let step1_1 = collection.find("step1_1").unwrap();
    assert_eq!(step1.resolved.name(), step1_1.resolved.name());
    assert_eq!(step1.address.as_str(), "Stage.asd.Execution.Step.step1");
    assert_eq!(
        step1_1.address.as_str(),
        "Stage.asd.Execution.StepGroup.grp1.Execution.Step.step1_1"
    );
}

#[test]
fn test_reordered_original_is_reported_not_misattributed() {
    let resolved = pipeline(
        r#"
pipeline:
  stages:
    - stage:
        identifier: s
        spec:
          execution:
            steps:
              - parallel:
                  - step: { identifier: a, name: tok-a }
                  - step: { identifier: b, name: tok-b }
"#,
    );
    let original = pipeline(
        r#"
pipeline:
  stages:
    - stage:
        identifier: s
        spec:
          execution:
            steps:
              - step: { identifier: b, name: Bee }
              - step: { identifier: a, name: Ay }
"#,
    );
    let collection = collect_steps(
        resolved.pipeline.find_stage("s").unwrap().execution().unwrap(),
        original.pipeline.find_stage("s").unwrap().execution(),
        &PathAddress::stage("s"),
    );

    assert_eq!(collection.find("a").unwrap().original.unwrap().name(), "Ay");
    assert_eq!(collection.find("b").unwrap().original.unwrap().name(), "Bee");
    assert_eq!(
        collection.divergences[0],
        Divergence::MovedInOriginal {
            identifier: "a".to_string(),
            resolved_path: "steps[0].parallel[0]".to_string(),
            original_path: "steps[1]".to_string(),
        }
    );
    let err = collection.ensure_consistent().unwrap_err();
    assert!(err.to_string().contains("2 mismatch"));
}
