//! Test: Variable Resolution
//!
//! - Rows only for tokens known to the metadata map
//! - Displayed values come from the authored document
//! - Sections follow the stage type

use crate::helpers::*;
use pipeline_inspect::core::{PipelineDocument, ResolutionContext, VariableMergeResponse};
use pipeline_inspect::resolve::{resolve_variables, Divergence, ValueKind};

#[test]
fn test_fixture_report_counts() {
    let report = resolve_variables(&fixture_context());

    assert_eq!(report.pipeline.len(), 1);
    assert_eq!(report.pipeline_variables.len(), 2);
    assert_eq!(report.stages.len(), 3);
    assert_eq!(report.row_count(), 17);
    assert_eq!(report.divergence_count(), 0);
}

#[test]
fn test_pipeline_rows_show_authored_values() {
    let report = resolve_variables(&fixture_context());

    let name = row(&report.pipeline, "name");
    assert_eq!(name.fqn, "pipeline.name");
    assert_eq!(name.value, "Release");

    let region = row(&report.pipeline_variables, "region");
    assert_eq!(region.value, "<+input>");
    assert_eq!(region.kind, ValueKind::RuntimeInput);
    assert_eq!(row(&report.pipeline_variables, "tag").kind, ValueKind::Fixed);
}

#[test]
fn test_deployment_stage_sections() {
    let report = resolve_variables(&fixture_context());
    let asd = stage(&report, "asd");

    assert_eq!(asd.address.as_str(), "Stage.asd");
    assert_eq!(row(&asd.service, "serviceRef").value, "nginx");
    let tag = row(&asd.service, "artifacts.primary.tag");
    assert_eq!(tag.value, "<+pipeline.variables.tag>");
    assert_eq!(tag.kind, ValueKind::Expression);
    assert_eq!(row(&asd.service, "manifests.m1.branch").value, "main");

    assert_eq!(row(&asd.infrastructure, "infra.environmentRef").value, "prod");
    assert_eq!(row(&asd.infrastructure, "infra.namespace").kind, ValueKind::RuntimeInput);
    assert!(asd.dependencies.is_empty());
}

#[test]
fn test_step_rows_in_collection_order() {
    let report = resolve_variables(&fixture_context());
    let asd = stage(&report, "asd");

    let steps: Vec<_> = asd.steps.iter().map(|s| (s.identifier.as_str(), s.rows.len())).collect();
    assert_eq!(steps, vec![("step1", 2), ("step1_1", 1), ("undo", 0), ("rollback", 1)]);

    let script = row(&asd.steps[0].rows, "step1.script");
    assert_eq!(script.value, "echo deploying to <+pipeline.variables.region>");
    assert!(asd.steps[3].rollback);
    assert_eq!(asd.steps[1].address.as_str(), "Stage.asd.Execution.StepGroup.grp1.Execution.Step.step1_1");
}

#[test]
fn test_build_stage_dependencies() {
    let report = resolve_variables(&fixture_context());
    let test1 = stage(&report, "test1");

    assert_eq!(row(&test1.dependencies, "db.image").value, "postgres:15");
    assert!(test1.service.is_empty());
    assert_eq!(row(&test1.steps[0].rows, "unit.command").value, "cargo test");
}

#[test]
fn test_merge_response_matches_separate_files() {
    let response = VariableMergeResponse::from_file(fixture("merge_response.json")).unwrap();
    let ctx = ResolutionContext::from_response(original_pipeline(), response).unwrap();
    let from_response = resolve_variables(&ctx);
    let from_files = resolve_variables(&fixture_context());

    assert_eq!(from_response.row_count(), from_files.row_count());
    assert_ne!(from_response.cycle_id, from_files.cycle_id);
}

#[test]
fn test_missing_metadata_yields_no_rows() {
    let original = original_pipeline();
    let resolved = resolved_pipeline();
    let ctx = ResolutionContext::new(original, resolved, Default::default());
    assert_eq!(resolve_variables(&ctx).row_count(), 0);
}

#[test]
fn test_stage_missing_from_original_has_blank_values() {
    let original = pipeline("pipeline:\n  identifier: p\n  stages: []\n");
    let resolved = PipelineDocument::parse(
        r#"
pipeline:
  identifier: p
  stages:
    - stage:
        identifier: late
        type: Deployment
        spec:
          infrastructure:
            environmentRef: tok-asd-env
"#,
    )
    .unwrap();
    let ctx = ResolutionContext::new(original, resolved, fixture_context().metadata);
    let report = resolve_variables(&ctx);
    let late = stage(&report, "late");
    assert_eq!(row(&late.infrastructure, "infra.environmentRef").value, "");
}

#[test]
fn test_steps_of_stage_missing_from_original_diverge() {
    let original = pipeline("pipeline:\n  identifier: p\n  stages: []\n");
    let resolved = PipelineDocument::parse(
        r#"
pipeline:
  identifier: p
  stages:
    - stage:
        identifier: late
        type: Custom
        spec:
          execution:
            steps:
              - step: { identifier: a, type: Wait }
"#,
    )
    .unwrap();
    let ctx = ResolutionContext::new(original, resolved, Default::default());
    let report = resolve_variables(&ctx);

    let late = stage(&report, "late");
    assert_eq!(late.steps.len(), 1);
    assert_eq!(
        late.divergences,
        vec![Divergence::MissingOriginal {
            identifier: "a".to_string(),
            path: "steps[0]".to_string(),
        }]
    );
}

#[test]
fn test_stages_with_runtime_input_fields_are_resolved() {
    let yaml = r#"
pipeline:
  identifier: p
  stages:
    - stage:
        identifier: a
        type: Custom
        variables: <+input>
    - stage:
        identifier: b
        type: Deployment
        spec:
          serviceConfig:
            serviceRef: svc
          execution: <+input>
"#;
    let original = pipeline(yaml);
    let resolved = PipelineDocument::parse(yaml).unwrap();
    let ctx = ResolutionContext::new(original, resolved, Default::default());
    let report = resolve_variables(&ctx);

    assert_eq!(report.stages.len(), 2);
    assert!(stage(&report, "a").variables.is_empty());
    assert!(stage(&report, "b").steps.is_empty());
    assert_eq!(report.divergence_count(), 0);
}
