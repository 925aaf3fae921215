//! Schema-aware variable resolution
//!
//! The walker is shallow on purpose; this module decides which nested blocks
//! of each node kind get walked (pipeline -> stage -> service / dependencies /
//! infrastructure / execution -> step) and dispatches step types to their
//! own field sets.

use crate::core::{
    config::{ExecutionNode, StageNode, StageType, StepNode},
    context::ResolutionContext,
    metadata::MetadataMap,
    path::PathAddress,
};
use crate::resolve::{
    steps::{collect_steps, Divergence},
    walker::{descend, walk, walk_value, VariableRow},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_yaml::Value;
use tracing::{debug, info};
use uuid::Uuid;

/// Rows for one step
#[derive(Debug, Clone, Serialize)]
pub struct StepVariables {
    pub identifier: String,
    pub name: String,
    pub step_type: String,
    /// Structural path inside the execution block
    pub path: String,
    pub address: PathAddress,
    pub rollback: bool,
    pub rows: Vec<VariableRow>,
}

/// Rows for one stage, grouped by section
#[derive(Debug, Clone, Serialize)]
pub struct StageVariables {
    pub identifier: String,
    pub name: String,
    pub address: PathAddress,
    pub rows: Vec<VariableRow>,
    pub variables: Vec<VariableRow>,
    pub service: Vec<VariableRow>,
    pub dependencies: Vec<VariableRow>,
    pub infrastructure: Vec<VariableRow>,
    pub steps: Vec<StepVariables>,
    pub divergences: Vec<Divergence>,
}

impl StageVariables {
    /// Every row of the stage, steps included
    pub fn all_rows(&self) -> impl Iterator<Item = &VariableRow> {
        self.rows
            .iter()
            .chain(&self.variables)
            .chain(&self.service)
            .chain(&self.dependencies)
            .chain(&self.infrastructure)
            .chain(self.steps.iter().flat_map(|s| s.rows.iter()))
    }
}

/// Full result of one resolution cycle
#[derive(Debug, Clone, Serialize)]
pub struct VariablesReport {
    pub cycle_id: Uuid,
    pub received_at: DateTime<Utc>,
    pub pipeline: Vec<VariableRow>,
    pub pipeline_variables: Vec<VariableRow>,
    pub stages: Vec<StageVariables>,
}

impl VariablesReport {
    pub fn row_count(&self) -> usize {
        self.pipeline.len()
            + self.pipeline_variables.len()
            + self.stages.iter().map(|s| s.all_rows().count()).sum::<usize>()
    }

    pub fn stage(&self, identifier: &str) -> Option<&StageVariables> {
        self.stages.iter().find(|s| s.identifier == identifier)
    }

    pub fn divergence_count(&self) -> usize {
        self.stages.iter().map(|s| s.divergences.len()).sum()
    }
}

/// Resolve every variable row of a pipeline
pub fn resolve_variables(ctx: &ResolutionContext) -> VariablesReport {
    let original = &ctx.original.pipeline;
    let resolved = &ctx.resolved.pipeline;

    let pipeline = walk(Some(&original.fields), &resolved.fields, &ctx.metadata);
    let pipeline_variables = walk_list(&original.variables, &resolved.variables, "name", &ctx.metadata);

    let stages = resolved
        .stages_flat()
        .into_iter()
        .map(|stage| {
            let counterpart = original.find_stage(stage.identifier());
            if counterpart.is_none() {
                debug!(stage = stage.identifier(), "Stage has no original counterpart");
            }
            resolve_stage(stage, counterpart, &ctx.metadata)
        })
        .collect();

    let report = VariablesReport {
        cycle_id: ctx.cycle_id,
        received_at: ctx.received_at,
        pipeline,
        pipeline_variables,
        stages,
    };
    info!(
        cycle = %ctx.cycle_id,
        rows = report.row_count(),
        divergences = report.divergence_count(),
        "Resolved pipeline variables"
    );
    report
}

/// Resolve the rows of one stage
///
/// `original` is `None` when the stage is absent from the original document;
/// its steps are then all reported as missing an original counterpart.
pub fn resolve_stage(resolved: &StageNode, original: Option<&StageNode>, metadata: &MetadataMap) -> StageVariables {
    let address = PathAddress::stage(resolved.identifier());

    let mut rows = walk(original.map(|o| &o.fields), &resolved.fields, metadata);
    rows.extend(walk(original.map(|o| &o.spec.fields), &resolved.spec.fields, metadata));

    let variables = walk_list(
        original.map(|o| o.variables.as_slice()).unwrap_or_default(),
        &resolved.variables,
        "name",
        metadata,
    );

    let (service, dependencies) = match resolved.stage_type() {
        StageType::Deployment => (service_rows(resolved, original, metadata), Vec::new()),
        StageType::Ci => (Vec::new(), dependency_rows(resolved, original, metadata)),
        _ => (Vec::new(), Vec::new()),
    };

    let infrastructure = infrastructure_rows(resolved, original, metadata);

    let no_steps = ExecutionNode::default();
    let original_execution = original.and_then(|o| o.execution()).unwrap_or(&no_steps);

    let (steps, divergences) = match resolved.execution() {
        Some(execution) => {
            let collection = collect_steps(execution, Some(original_execution), &address);
            let steps = collection
                .steps
                .iter()
                .map(|collected| StepVariables {
                    identifier: collected.identifier().to_string(),
                    name: collected
                        .original
                        .unwrap_or(collected.resolved)
                        .name()
                        .to_string(),
                    step_type: collected.resolved.step_type().to_string(),
                    path: collected.path.clone(),
                    address: collected.address.clone(),
                    rollback: collected.rollback,
                    rows: resolve_step(collected.resolved, collected.original, metadata),
                })
                .collect();
            (steps, collection.divergences)
        }
        None => (Vec::new(), Vec::new()),
    };

    StageVariables {
        identifier: resolved.identifier().to_string(),
        name: original.unwrap_or(resolved).name().to_string(),
        address,
        rows,
        variables,
        service,
        dependencies,
        infrastructure,
        steps,
        divergences,
    }
}

fn service_rows(resolved: &StageNode, original: Option<&StageNode>, metadata: &MetadataMap) -> Vec<VariableRow> {
    let r = resolved.spec.service_config.as_ref();
    let o = original.and_then(|o| o.spec.service_config.as_ref());

    let mut rows = walk_value(o, r, metadata);
    rows.extend(walk_value(
        original.and_then(|o| o.spec.fields.get("service")),
        resolved.spec.fields.get("service"),
        metadata,
    ));

    let definition = ["serviceDefinition"];
    let spec = ["serviceDefinition", "spec"];
    rows.extend(walk_value(descend(o, &definition), descend(r, &definition), metadata));
    rows.extend(walk_value(descend(o, &spec), descend(r, &spec), metadata));

    let o_spec = descend(o, &spec);
    let r_spec = descend(r, &spec);

    let primary = ["artifacts", "primary", "spec"];
    rows.extend(walk_value(descend(o_spec, &primary), descend(r_spec, &primary), metadata));
    rows.extend(walk_nested_list(
        descend(o_spec, &["artifacts", "sidecars"]),
        descend(r_spec, &["artifacts", "sidecars"]),
        "sidecar",
        &[&["spec"]],
        metadata,
    ));
    rows.extend(walk_nested_list(
        descend(o_spec, &["manifests"]),
        descend(r_spec, &["manifests"]),
        "manifest",
        &[&[], &["spec"], &["spec", "store", "spec"]],
        metadata,
    ));
    rows.extend(walk_list(
        seq(descend(o_spec, &["variables"])),
        seq(descend(r_spec, &["variables"])),
        "name",
        metadata,
    ));

    rows
}

fn dependency_rows(resolved: &StageNode, original: Option<&StageNode>, metadata: &MetadataMap) -> Vec<VariableRow> {
    let originals = original
        .map(|o| o.spec.service_dependencies.as_slice())
        .unwrap_or_default();

    let mut rows = Vec::new();
    for (o, r) in zip_entries(originals, &resolved.spec.service_dependencies, "identifier") {
        rows.extend(walk_value(o, Some(r), metadata));
        rows.extend(walk_value(descend(o, &["spec"]), r.get("spec"), metadata));
    }
    rows
}

fn infrastructure_rows(resolved: &StageNode, original: Option<&StageNode>, metadata: &MetadataMap) -> Vec<VariableRow> {
    let r = resolved.spec.infrastructure.as_ref();
    let o = original.and_then(|o| o.spec.infrastructure.as_ref());

    let mut rows = walk_value(o, r, metadata);
    let definition = ["infrastructureDefinition"];
    let spec = ["infrastructureDefinition", "spec"];
    rows.extend(walk_value(descend(o, &definition), descend(r, &definition), metadata));
    rows.extend(walk_value(descend(o, &spec), descend(r, &spec), metadata));
    rows.extend(walk_value(
        original.and_then(|o| o.spec.fields.get("environment")),
        resolved.spec.fields.get("environment"),
        metadata,
    ));
    rows
}

/// Resolve the rows of one step, dispatching on its type
pub fn resolve_step(resolved: &StepNode, original: Option<&StepNode>, metadata: &MetadataMap) -> Vec<VariableRow> {
    let o_spec = original.and_then(StepNode::spec);
    let r_spec = resolved.spec();

    let mut rows = walk(original.map(|o| &o.fields), &resolved.fields, metadata);
    rows.extend(walk_value(o_spec, r_spec, metadata));

    let list = |key: &str, id_key: &str| {
        walk_list(
            seq(descend(o_spec, &[key])),
            seq(descend(r_spec, &[key])),
            id_key,
            metadata,
        )
    };

    match resolved.step_type() {
        "ShellScript" => {
            let source = ["source", "spec"];
            rows.extend(walk_value(descend(o_spec, &source), descend(r_spec, &source), metadata));
            rows.extend(list("environmentVariables", "name"));
            rows.extend(list("outputVariables", "name"));
        }
        "Http" => {
            rows.extend(list("headers", "key"));
            rows.extend(list("outputVariables", "name"));
        }
        _ => {}
    }

    rows
}

fn seq(value: Option<&Value>) -> &[Value] {
    value
        .and_then(Value::as_sequence)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Pair list entries by `key`, falling back to position when an entry has no key
fn zip_entries<'a>(original: &'a [Value], resolved: &'a [Value], key: &str) -> Vec<(Option<&'a Value>, &'a Value)> {
    resolved
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let counterpart = match entry.get(key).and_then(Value::as_str) {
                Some(id) => original
                    .iter()
                    .find(|o| o.get(key).and_then(Value::as_str) == Some(id)),
                None => original.get(i),
            };
            (counterpart, entry)
        })
        .collect()
}

fn walk_list(original: &[Value], resolved: &[Value], key: &str, metadata: &MetadataMap) -> Vec<VariableRow> {
    zip_entries(original, resolved, key)
        .into_iter()
        .flat_map(|(o, r)| walk_value(o, Some(r), metadata))
        .collect()
}

/// Walk lists of single-key wrappers (`- manifest: {...}`) at several depths
fn walk_nested_list(
    original: Option<&Value>,
    resolved: Option<&Value>,
    wrapper: &str,
    depths: &[&[&str]],
    metadata: &MetadataMap,
) -> Vec<VariableRow> {
    let mut rows = Vec::new();
    let originals = seq(original);
    for (i, entry) in seq(resolved).iter().enumerate() {
        let r = entry.get(wrapper);
        let r_id = r.and_then(|v| v.get("identifier")).and_then(Value::as_str);
        let o = originals
            .iter()
            .filter_map(|o| o.get(wrapper))
            .find(|o| r_id.is_some() && o.get("identifier").and_then(Value::as_str) == r_id)
            .or_else(|| originals.get(i).and_then(|o| o.get(wrapper)));
        for keys in depths {
            rows.extend(walk_value(descend(o, keys), descend(r, keys), metadata));
        }
    }
    rows
}
