//! Variable resolution and navigation projections

pub mod dispatch;
pub mod steps;
pub mod tree;
pub mod walker;

pub use dispatch::{resolve_stage, resolve_step, resolve_variables, StageVariables, StepVariables, VariablesReport};
pub use steps::{collect_steps, CollectedStep, Divergence, StepCollection};
pub use tree::{project_tree, DisplayTreeNode};
pub use walker::{walk, ValueKind, VariableRow};
