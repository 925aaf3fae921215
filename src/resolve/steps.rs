//! Step collector - flattens an execution graph into ordered steps
//!
//! Steps, step groups and parallel blocks nest arbitrarily. The collector
//! walks `steps` then `rollbackSteps`, and within a step group its `steps`
//! then its `rollbackSteps`, producing one entry per step with the structural
//! path used to write edits back (`steps[1].stepGroup.steps[0]`).
//!
//! Original counterparts are matched by identifier rather than position, and
//! any disagreement between the two documents is reported as a `Divergence`.

use crate::core::{
    config::{ExecutionElement, ExecutionNode, StepNode},
    path::PathAddress,
};
use crate::error::ResolveError;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

/// Root of the main step list
pub const STEPS_ROOT: &str = "steps";

/// Root of the rollback step list
pub const ROLLBACK_ROOT: &str = "rollbackSteps";

/// One collected step
#[derive(Debug, Clone, Serialize)]
pub struct CollectedStep<'a> {
    pub resolved: &'a StepNode,

    /// Counterpart in the original document, matched by identifier
    pub original: Option<&'a StepNode>,

    /// Structural path inside the execution block
    pub path: String,

    /// Navigation address
    pub address: PathAddress,

    /// Collected from a rollback list
    pub rollback: bool,
}

impl CollectedStep<'_> {
    pub fn identifier(&self) -> &str {
        self.resolved.identifier()
    }
}

/// Disagreement between the resolved and original execution graphs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Divergence {
    /// Resolved step has no original counterpart
    MissingOriginal { identifier: String, path: String },

    /// Counterpart exists but sits at a different path
    MovedInOriginal {
        identifier: String,
        resolved_path: String,
        original_path: String,
    },

    /// Original step absent from the resolved graph
    MissingResolved { identifier: String, path: String },

    /// Identifier seen more than once in the resolved graph
    DuplicateIdentifier { identifier: String, path: String },
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Divergence::MissingOriginal { identifier, path } => {
                write!(f, "step '{}' at {} has no original counterpart", identifier, path)
            }
            Divergence::MovedInOriginal {
                identifier,
                resolved_path,
                original_path,
            } => write!(
                f,
                "step '{}' is at {} but at {} in the original",
                identifier, resolved_path, original_path
            ),
            Divergence::MissingResolved { identifier, path } => {
                write!(f, "original step '{}' at {} is missing from resolved", identifier, path)
            }
            Divergence::DuplicateIdentifier { identifier, path } => {
                write!(f, "duplicate step identifier '{}' at {}", identifier, path)
            }
        }
    }
}

/// Result of one collection pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct StepCollection<'a> {
    /// Steps in document order
    pub steps: Vec<CollectedStep<'a>>,

    /// Step identifier -> structural path, for this pass only
    pub identifier_index: HashMap<String, String>,

    pub divergences: Vec<Divergence>,
}

impl<'a> StepCollection<'a> {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Structural path of a step identifier
    pub fn path_of(&self, identifier: &str) -> Option<&str> {
        self.identifier_index.get(identifier).map(String::as_str)
    }

    pub fn find(&self, identifier: &str) -> Option<&CollectedStep<'a>> {
        self.steps.iter().find(|s| s.identifier() == identifier)
    }

    pub fn is_consistent(&self) -> bool {
        self.divergences.is_empty()
    }

    /// Turn reported divergences into an error
    pub fn ensure_consistent(&self) -> Result<(), ResolveError> {
        match self.divergences.first() {
            None => Ok(()),
            Some(first) => Err(ResolveError::StructuralMismatch {
                count: self.divergences.len(),
                first: first.to_string(),
            }),
        }
    }
}

/// A step found during traversal
struct Visited<'a> {
    step: &'a StepNode,
    path: String,
    address: PathAddress,
    rollback: bool,
}

fn visit<'a>(
    elements: &'a [ExecutionElement],
    parent_path: &str,
    base: &PathAddress,
    rollback: bool,
    out: &mut Vec<Visited<'a>>,
) {
    for (i, element) in elements.iter().enumerate() {
        match element {
            ExecutionElement::Step { step } => out.push(Visited {
                step,
                path: format!("{}[{}]", parent_path, i),
                address: PathAddress::build(base, "Step", step.identifier()),
                rollback,
            }),
            ExecutionElement::StepGroup { step_group } => {
                let group = PathAddress::build(base, "StepGroup", step_group.identifier());
                visit(
                    &step_group.steps,
                    &format!("{}[{}].stepGroup.steps", parent_path, i),
                    &group.segment("Execution"),
                    rollback,
                    out,
                );
                visit(
                    &step_group.rollback_steps,
                    &format!("{}[{}].stepGroup.rollbackSteps", parent_path, i),
                    &group.segment("Rollback"),
                    true,
                    out,
                );
            }
            ExecutionElement::Parallel { parallel } => {
                visit(parallel, &format!("{}[{}].parallel", parent_path, i), base, rollback, out);
            }
            ExecutionElement::Opaque(_) => {
                debug!(path = %format!("{}[{}]", parent_path, i), "Skipping unrecognized execution entry");
            }
        }
    }
}

fn visit_execution<'a>(execution: &'a ExecutionNode, stage: &PathAddress) -> Vec<Visited<'a>> {
    let mut out = Vec::new();
    visit(&execution.steps, STEPS_ROOT, &stage.segment("Execution"), false, &mut out);
    visit(
        &execution.rollback_steps,
        ROLLBACK_ROOT,
        &stage.segment("Rollback"),
        true,
        &mut out,
    );
    out
}

/// Collect every step of `resolved`, pairing each with its original counterpart
///
/// `stage` is the navigation address of the owning stage.
pub fn collect_steps<'a>(
    resolved: &'a ExecutionNode,
    original: Option<&'a ExecutionNode>,
    stage: &PathAddress,
) -> StepCollection<'a> {
    let mut collection = StepCollection::default();

    let original_steps = original
        .map(|o| visit_execution(o, stage))
        .unwrap_or_default();
    let mut original_index: HashMap<&str, &Visited<'a>> = HashMap::new();
    let mut original_by_path: HashMap<&str, &Visited<'a>> = HashMap::new();
    for visited in &original_steps {
        let identifier = visited.step.identifier();
        if identifier.is_empty() {
            original_by_path.insert(visited.path.as_str(), visited);
        } else {
            original_index.entry(identifier).or_insert(visited);
        }
    }
    let mut paired_by_path = HashSet::new();

    for visited in visit_execution(resolved, stage) {
        let identifier = visited.step.identifier();
        // Steps without an identifier only pair with an identifier-less
        // original at the same path
        let counterpart = if identifier.is_empty() {
            let found = original_by_path.get(visited.path.as_str()).copied();
            if let Some(found) = found {
                paired_by_path.insert(found.path.as_str());
            }
            found
        } else {
            original_index.get(identifier).copied()
        };

        match counterpart {
            None if original.is_some() => collection.divergences.push(Divergence::MissingOriginal {
                identifier: identifier.to_string(),
                path: visited.path.clone(),
            }),
            Some(found) if found.path != visited.path => {
                collection.divergences.push(Divergence::MovedInOriginal {
                    identifier: identifier.to_string(),
                    resolved_path: visited.path.clone(),
                    original_path: found.path.clone(),
                })
            }
            _ => {}
        }

        if !identifier.is_empty()
            && collection
                .identifier_index
                .insert(identifier.to_string(), visited.path.clone())
                .is_some()
        {
            collection.divergences.push(Divergence::DuplicateIdentifier {
                identifier: identifier.to_string(),
                path: visited.path.clone(),
            });
        }

        collection.steps.push(CollectedStep {
            resolved: visited.step,
            original: counterpart.map(|c| c.step),
            path: visited.path,
            address: visited.address,
            rollback: visited.rollback,
        });
    }

    for visited in &original_steps {
        let identifier = visited.step.identifier();
        let present = if identifier.is_empty() {
            paired_by_path.contains(visited.path.as_str())
        } else {
            collection.identifier_index.contains_key(identifier)
        };
        if !present {
            collection.divergences.push(Divergence::MissingResolved {
                identifier: identifier.to_string(),
                path: visited.path.clone(),
            });
        }
    }

    for divergence in &collection.divergences {
        warn!(stage = %stage, "{}", divergence);
    }
    debug!(stage = %stage, steps = collection.steps.len(), "Collected steps");

    collection
}
