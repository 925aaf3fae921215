//! Pipeline document model loaded from YAML
//!
//! Structural nodes (stages, parallel wrappers, step groups, steps) are typed;
//! everything else a node carries stays in its `fields` mapping so the
//! variable walker can see the node's own scalar entries.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Stage type used for deployments
pub const DEPLOYMENT_STAGE: &str = "Deployment";

/// Stage type used for builds
pub const BUILD_STAGE: &str = "CI";

/// A complete pipeline document (`pipeline:` at the top level)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineDocument {
    pub pipeline: PipelineNode,
}

/// The pipeline node itself
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineNode {
    /// Stage entries in document order
    #[serde(default)]
    pub stages: Vec<StageElement>,

    /// Pipeline variables (`name`/`type`/`value` entries)
    #[serde(default)]
    pub variables: Vec<Value>,

    /// Remaining pipeline entries (name, identifier, tags, ...)
    #[serde(flatten)]
    pub fields: Mapping,
}

/// One entry of a `stages` list
///
/// A `stage:` entry always stays a stage, even when its body does not fit the
/// typed model (e.g. `variables: <+input>`); see [`StageNode::from_value`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StageElement {
    Stage { stage: StageNode },
    Parallel { parallel: Vec<StageElement> },
    /// Entry of a kind this model does not know; preserved as-is
    Opaque(Value),
}

/// Known stage types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageType {
    Deployment,
    Ci,
    Approval,
    Custom,
    Other(String),
}

impl StageType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            DEPLOYMENT_STAGE => StageType::Deployment,
            BUILD_STAGE => StageType::Ci,
            "Approval" => StageType::Approval,
            "Custom" => StageType::Custom,
            other => StageType::Other(other.to_string()),
        }
    }
}

/// A single stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageNode {
    #[serde(default)]
    pub spec: StageSpec,

    /// Stage variables
    #[serde(default)]
    pub variables: Vec<Value>,

    /// Remaining stage entries (name, identifier, type, description, ...)
    #[serde(flatten)]
    pub fields: Mapping,
}

/// Stage `spec` block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageSpec {
    #[serde(rename = "serviceConfig", default, skip_serializing_if = "Option::is_none")]
    pub service_config: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionNode>,

    /// Build-stage service dependencies
    #[serde(rename = "serviceDependencies", default, skip_serializing_if = "Vec::is_empty")]
    pub service_dependencies: Vec<Value>,

    #[serde(flatten)]
    pub fields: Mapping,
}

/// A stage's execution block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionNode {
    #[serde(default)]
    pub steps: Vec<ExecutionElement>,

    #[serde(rename = "rollbackSteps", default)]
    pub rollback_steps: Vec<ExecutionElement>,
}

/// One entry of a `steps` / `rollbackSteps` list
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExecutionElement {
    Step {
        step: StepNode,
    },
    StepGroup {
        #[serde(rename = "stepGroup")]
        step_group: StepGroupNode,
    },
    Parallel {
        parallel: Vec<ExecutionElement>,
    },
    /// Entry of a kind this model does not know; preserved as-is
    Opaque(Value),
}

/// A single step; every entry (including `spec`) stays in `fields`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepNode {
    #[serde(flatten)]
    pub fields: Mapping,
}

/// A step group with its own steps and rollback steps
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepGroupNode {
    #[serde(default)]
    pub steps: Vec<ExecutionElement>,

    #[serde(rename = "rollbackSteps", default)]
    pub rollback_steps: Vec<ExecutionElement>,

    #[serde(flatten)]
    pub fields: Mapping,
}

impl<'de> Deserialize<'de> for StageElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(StageElement::from_value(Value::deserialize(deserializer)?))
    }
}

impl<'de> Deserialize<'de> for ExecutionElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(ExecutionElement::from_value(Value::deserialize(deserializer)?))
    }
}

impl StageElement {
    /// Classify a raw `stages` entry by its wrapper key
    pub fn from_value(value: Value) -> Self {
        if let Value::Mapping(map) = &value {
            match (map.get("stage"), map.get("parallel")) {
                (Some(body @ Value::Mapping(_)), _) => {
                    return StageElement::Stage {
                        stage: StageNode::from_value(body.clone()),
                    }
                }
                (None, Some(Value::Sequence(entries))) => {
                    return StageElement::Parallel {
                        parallel: entries.iter().cloned().map(StageElement::from_value).collect(),
                    }
                }
                _ => {}
            }
        }
        StageElement::Opaque(value)
    }
}

impl ExecutionElement {
    /// Classify a raw `steps` entry by its wrapper key
    pub fn from_value(value: Value) -> Self {
        if let Value::Mapping(map) = &value {
            match (map.get("step"), map.get("stepGroup"), map.get("parallel")) {
                (Some(Value::Mapping(body)), _, _) => {
                    return ExecutionElement::Step {
                        step: StepNode { fields: body.clone() },
                    }
                }
                (None, Some(body @ Value::Mapping(_)), _) => {
                    return ExecutionElement::StepGroup {
                        step_group: StepGroupNode::from_value(body.clone()),
                    }
                }
                (None, None, Some(Value::Sequence(entries))) => {
                    return ExecutionElement::Parallel {
                        parallel: entries.iter().cloned().map(ExecutionElement::from_value).collect(),
                    }
                }
                _ => {}
            }
        }
        ExecutionElement::Opaque(value)
    }
}

/// Take a typed entry out of `fields`
///
/// An entry that does not fit `T` (a runtime input, an expression) is put
/// back untouched so it stays visible as one of the node's own values.
fn take_typed<T: DeserializeOwned>(fields: &mut Mapping, key: &str) -> Option<T> {
    let raw = fields.remove(key)?;
    match serde_yaml::from_value::<T>(raw.clone()) {
        Ok(typed) => Some(typed),
        Err(e) => {
            debug!(key, error = %e, "Keeping untyped entry as raw value");
            fields.insert(Value::from(key), raw);
            None
        }
    }
}

/// Read a string entry from a mapping
pub fn str_field<'a>(fields: &'a Mapping, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str)
}

impl StageNode {
    /// Build a stage from its raw body, keeping identity whatever the body holds
    pub fn from_value(value: Value) -> Self {
        let mut fields = match value {
            Value::Mapping(fields) => fields,
            _ => return StageNode::default(),
        };
        let variables = take_typed(&mut fields, "variables").unwrap_or_default();
        let spec = match fields.remove("spec") {
            Some(Value::Mapping(spec)) => StageSpec::from_mapping(spec),
            Some(other) => {
                fields.insert(Value::from("spec"), other);
                StageSpec::default()
            }
            None => StageSpec::default(),
        };
        StageNode {
            spec,
            variables,
            fields,
        }
    }

    pub fn identifier(&self) -> &str {
        str_field(&self.fields, "identifier").unwrap_or_default()
    }

    /// Display name, falling back to the identifier
    pub fn name(&self) -> &str {
        str_field(&self.fields, "name").unwrap_or_else(|| self.identifier())
    }

    pub fn stage_type(&self) -> StageType {
        StageType::parse(str_field(&self.fields, "type").unwrap_or_default())
    }

    pub fn execution(&self) -> Option<&ExecutionNode> {
        self.spec.execution.as_ref()
    }
}

impl StageSpec {
    fn from_mapping(mut fields: Mapping) -> Self {
        StageSpec {
            service_config: fields.remove("serviceConfig"),
            infrastructure: fields.remove("infrastructure"),
            execution: take_typed(&mut fields, "execution"),
            service_dependencies: take_typed(&mut fields, "serviceDependencies").unwrap_or_default(),
            fields,
        }
    }
}

impl StepNode {
    pub fn identifier(&self) -> &str {
        str_field(&self.fields, "identifier").unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        str_field(&self.fields, "name").unwrap_or_else(|| self.identifier())
    }

    pub fn step_type(&self) -> &str {
        str_field(&self.fields, "type").unwrap_or_default()
    }

    pub fn spec(&self) -> Option<&Value> {
        self.fields.get("spec")
    }
}

impl StepGroupNode {
    fn from_value(value: Value) -> Self {
        let mut fields = match value {
            Value::Mapping(fields) => fields,
            _ => return StepGroupNode::default(),
        };
        StepGroupNode {
            steps: take_typed(&mut fields, "steps").unwrap_or_default(),
            rollback_steps: take_typed(&mut fields, "rollbackSteps").unwrap_or_default(),
            fields,
        }
    }

    pub fn identifier(&self) -> &str {
        str_field(&self.fields, "identifier").unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        str_field(&self.fields, "name").unwrap_or_else(|| self.identifier())
    }
}

impl PipelineNode {
    pub fn identifier(&self) -> &str {
        str_field(&self.fields, "identifier").unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        str_field(&self.fields, "name").unwrap_or_else(|| self.identifier())
    }

    /// All stages in document order, parallel wrappers flattened
    pub fn stages_flat(&self) -> Vec<&StageNode> {
        let mut out = Vec::new();
        flatten_stages(&self.stages, &mut out);
        out
    }

    /// Find a stage by identifier (searching inside parallel wrappers)
    pub fn find_stage(&self, identifier: &str) -> Option<&StageNode> {
        self.stages_flat()
            .into_iter()
            .find(|s| s.identifier() == identifier)
    }
}

fn flatten_stages<'a>(elements: &'a [StageElement], out: &mut Vec<&'a StageNode>) {
    for element in elements {
        match element {
            StageElement::Stage { stage } => out.push(stage),
            StageElement::Parallel { parallel } => flatten_stages(parallel, out),
            StageElement::Opaque(_) => {
                debug!("Skipping unrecognized stage entry");
            }
        }
    }
}

impl ExecutionNode {
    /// Identifiers of every step and step group, in document order
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        collect_identifiers(&self.steps, &mut ids);
        collect_identifiers(&self.rollback_steps, &mut ids);
        ids
    }

    /// Number of steps (step groups and parallel wrappers not counted)
    pub fn step_count(&self) -> usize {
        count_steps(&self.steps) + count_steps(&self.rollback_steps)
    }
}

fn collect_identifiers<'a>(elements: &'a [ExecutionElement], ids: &mut Vec<&'a str>) {
    for element in elements {
        match element {
            ExecutionElement::Step { step } => ids.push(step.identifier()),
            ExecutionElement::StepGroup { step_group } => {
                ids.push(step_group.identifier());
                collect_identifiers(&step_group.steps, ids);
                collect_identifiers(&step_group.rollback_steps, ids);
            }
            ExecutionElement::Parallel { parallel } => collect_identifiers(parallel, ids),
            ExecutionElement::Opaque(_) => {}
        }
    }
}

fn count_steps(elements: &[ExecutionElement]) -> usize {
    elements
        .iter()
        .map(|element| match element {
            ExecutionElement::Step { .. } => 1,
            ExecutionElement::StepGroup { step_group } => {
                count_steps(&step_group.steps) + count_steps(&step_group.rollback_steps)
            }
            ExecutionElement::Parallel { parallel } => count_steps(parallel),
            ExecutionElement::Opaque(_) => 0,
        })
        .sum()
}

impl PipelineDocument {
    /// Load a pipeline document from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a pipeline document from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let document = Self::parse(yaml)?;
        document.validate()?;
        Ok(document)
    }

    /// Parse without validating
    ///
    /// Resolved documents go through here: they mirror an already validated
    /// original and must never be rejected for shape alone.
    pub fn parse(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml).context("Invalid pipeline YAML")?;
        let node = match value {
            Value::Mapping(mut map) if map.contains_key("pipeline") => {
                map.remove("pipeline").unwrap_or(Value::Null)
            }
            other => other,
        };
        let pipeline: PipelineNode =
            serde_yaml::from_value(node).context("Invalid pipeline structure")?;
        Ok(PipelineDocument { pipeline })
    }

    /// Validate identifiers across the document
    pub fn validate(&self) -> Result<()> {
        let mut stage_ids = HashSet::new();
        for stage in self.pipeline.stages_flat() {
            let id = stage.identifier();
            if id.is_empty() {
                anyhow::bail!("Stage '{}' has no identifier", stage.name());
            }
            if !stage_ids.insert(id) {
                anyhow::bail!("Duplicate stage identifier: {}", id);
            }

            if let Some(execution) = stage.execution() {
                let mut step_ids = HashSet::new();
                for step_id in execution.identifiers() {
                    if step_id.is_empty() {
                        anyhow::bail!("Stage '{}' has a step without identifier", id);
                    }
                    if !step_ids.insert(step_id) {
                        anyhow::bail!(
                            "Stage '{}' has duplicate step identifier '{}'",
                            id,
                            step_id
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Total number of stages, parallel wrappers flattened
    pub fn stage_count(&self) -> usize {
        self.pipeline.stages_flat().len()
    }

    /// Total number of steps across all stages
    pub fn step_count(&self) -> usize {
        self.pipeline
            .stages_flat()
            .iter()
            .filter_map(|s| s.execution())
            .map(ExecutionNode::step_count)
            .sum()
    }
}
