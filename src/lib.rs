//! pipeline-inspect - resolved pipeline variables, step collection and navigation trees

pub mod cli;
pub mod core;
pub mod error;
pub mod resolve;

// Re-export commonly used types
pub use crate::core::{PathAddress, PipelineDocument, ResolutionContext, MetadataMap, VariableMetadata};
pub use crate::error::ResolveError;
pub use crate::resolve::{collect_steps, project_tree, resolve_variables, DisplayTreeNode, StepCollection, VariableRow, VariablesReport};
