//! Navigation addresses for pipeline nodes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between address segments
pub const SEPARATOR: char = '.';

/// Hierarchical address of a node in the pipeline/stage/execution tree
///
/// Built by concatenating ancestor segments with the node kind and identifier,
/// e.g. `Stage.deploy.Execution.StepGroup.grp1.Execution.Step.step1`.
/// Identifiers are not normalized: an identifier containing `.` makes the
/// address ambiguous.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathAddress(String);

impl PathAddress {
    /// The empty root address
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Build the address of a node of `kind` with `identifier` under `ancestor`
    pub fn build(ancestor: &PathAddress, kind: &str, identifier: &str) -> Self {
        ancestor.segment(kind).segment(identifier)
    }

    /// Append one fixed segment (e.g. `Service`, `Execution`)
    pub fn segment(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}{}{}", self.0, SEPARATOR, name))
        }
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address of the stage node for a stage identifier
    pub fn stage(identifier: &str) -> Self {
        Self::build(&Self::root(), "Stage", identifier)
    }
}

impl fmt::Display for PathAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PathAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for PathAddress {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
