//! Test: Navigation Tree Projection
//!
//! - Fixed `Pipeline` / `Pipeline.Variables` scaffolding
//! - Parallel wrappers never produce their own node
//! - Stage-type specific children

use crate::helpers::*;
use pipeline_inspect::resolve::{project_tree, DisplayTreeNode};

fn ids(nodes: &[DisplayTreeNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.id.as_str()).collect()
}

#[test]
fn test_fixture_tree_stage_nodes() {
    let forest = project_tree(&original_pipeline());

    assert_eq!(ids(&forest), vec!["Pipeline", "Pipeline.Variables", "Stages"]);
    let stages = &forest[2];
    assert!(stages.expanded);
    assert_eq!(ids(&stages.children), vec!["Stage.asd", "Stage.test1", "Stage.test2"]);
}

#[test]
fn test_every_stage_has_fixed_children() {
    let forest = project_tree(&original_pipeline());
    for stage in &forest[2].children {
        let id = stage.id.as_str();
        assert_eq!(stage.children.first().unwrap().id.as_str(), format!("{}.Variables", id));
        let tail: Vec<_> = stage.children.iter().rev().take(2).map(|c| c.id.to_string()).collect();
        assert_eq!(tail, vec![format!("{}.Execution", id), format!("{}.Infrastructure", id)]);
    }
}

#[test]
fn test_stage_type_specific_children() {
    let forest = project_tree(&original_pipeline());
    let stages = &forest[2];

    let asd = stages.child("Stage.asd").unwrap();
    assert!(asd.child("Stage.asd.Service").unwrap().expanded);
    assert!(asd.find("Stage.asd.Service.Manifests").is_some());

    let test1 = stages.child("Stage.test1").unwrap();
    assert!(test1.child("Stage.test1.Dependencies").is_some());
    assert!(test1.child("Stage.test1.Service").is_none());

    let test2 = stages.child("Stage.test2").unwrap();
    assert_eq!(test2.children.len(), 4);
}

#[test]
fn test_stage_count_matches_parallel_members() {
    let doc = pipeline(
        r#"
pipeline:
  identifier: p
  stages:
    - parallel:
        - stage: { identifier: a, type: Custom }
        - stage: { identifier: b, type: Custom }
        - stage: { identifier: c, type: Custom }
    - stage: { identifier: d, type: Custom }
    - parallel:
        - stage: { identifier: e, type: Custom }
"#,
    );
    let forest = project_tree(&doc);
    assert_eq!(forest[2].children.len(), 5);
}

#[test]
fn test_scaffolding_without_stages() {
    let forest = project_tree(&pipeline("pipeline:\n  identifier: empty\n"));
    assert_eq!(ids(&forest), vec!["Pipeline", "Pipeline.Variables"]);
}

#[test]
fn test_tree_serializes_to_json() {
    let forest = project_tree(&original_pipeline());
    let json = serde_json::to_value(&forest).unwrap();
    assert_eq!(json[0]["id"], "Pipeline");
    assert_eq!(json[2]["children"][0]["id"], "Stage.asd");
    assert_eq!(json[2]["expanded"], true);
}
