//! Test utility functions for pipeline-inspect

#![allow(dead_code)]

use pipeline_inspect::core::{load_metadata, PipelineDocument, ResolutionContext};
use pipeline_inspect::resolve::{StageVariables, VariableRow, VariablesReport};
use std::path::PathBuf;

/// Path of a file under tests/fixtures
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// The authored fixture pipeline
pub fn original_pipeline() -> PipelineDocument {
    PipelineDocument::from_file(fixture("pipeline.yaml")).expect("fixture pipeline should load")
}

/// The resolved fixture pipeline (tokens in place of runtime fields)
pub fn resolved_pipeline() -> PipelineDocument {
    let yaml = std::fs::read_to_string(fixture("resolved.yaml")).expect("resolved fixture should exist");
    PipelineDocument::parse(&yaml).expect("resolved fixture should parse")
}

/// A resolution context built from the three fixture files
pub fn fixture_context() -> ResolutionContext {
    ResolutionContext::new(
        original_pipeline(),
        resolved_pipeline(),
        load_metadata(fixture("metadata.json")).expect("metadata fixture should load"),
    )
}

/// Parse an inline pipeline, panicking with the YAML error on failure
pub fn pipeline(yaml: &str) -> PipelineDocument {
    PipelineDocument::from_yaml(yaml).unwrap_or_else(|e| panic!("invalid test pipeline: {:#}", e))
}

/// Find a row by local name
pub fn row<'a>(rows: &'a [VariableRow], local_name: &str) -> &'a VariableRow {
    rows.iter()
        .find(|r| r.local_name == local_name)
        .unwrap_or_else(|| panic!("row '{}' not found in {:?}", local_name, rows))
}

/// Find a stage in a report
pub fn stage<'a>(report: &'a VariablesReport, identifier: &str) -> &'a StageVariables {
    report
        .stage(identifier)
        .unwrap_or_else(|| panic!("stage '{}' not in report", identifier))
}
