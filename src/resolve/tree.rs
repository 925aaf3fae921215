//! Navigation tree projection

use crate::core::{
    config::{PipelineDocument, StageNode, StageType},
    path::PathAddress,
};
use serde::{Deserialize, Serialize};

/// Node of the navigation tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayTreeNode {
    pub id: PathAddress,
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DisplayTreeNode>,
    #[serde(default)]
    pub expanded: bool,
}

impl DisplayTreeNode {
    pub fn leaf(id: PathAddress, label: &str) -> Self {
        Self {
            id,
            label: label.to_string(),
            children: Vec::new(),
            expanded: false,
        }
    }

    pub fn with_children(mut self, children: Vec<DisplayTreeNode>) -> Self {
        self.children = children;
        self
    }

    pub fn expanded(mut self) -> Self {
        self.expanded = true;
        self
    }

    /// Child with the given id
    pub fn child(&self, id: &str) -> Option<&DisplayTreeNode> {
        self.children.iter().find(|c| c.id == id)
    }

    /// Depth-first search by id, including self
    pub fn find(&self, id: &str) -> Option<&DisplayTreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

/// Project a pipeline into its navigation forest
///
/// The forest always starts with `Pipeline` and `Pipeline.Variables`; a
/// `Stages` node follows when the pipeline has at least one stage.
pub fn project_tree(document: &PipelineDocument) -> Vec<DisplayTreeNode> {
    let pipeline = PathAddress::root().segment("Pipeline");
    let mut forest = vec![
        DisplayTreeNode::leaf(pipeline.clone(), "Pipeline"),
        DisplayTreeNode::leaf(pipeline.segment("Variables"), "Variables"),
    ];

    let stages = document.pipeline.stages_flat();
    if !stages.is_empty() {
        let children = stages.into_iter().map(project_stage).collect();
        forest.push(
            DisplayTreeNode::leaf(PathAddress::root().segment("Stages"), "Stages")
                .with_children(children)
                .expanded(),
        );
    }

    forest
}

fn project_stage(stage: &StageNode) -> DisplayTreeNode {
    let id = PathAddress::stage(stage.identifier());
    let mut children = vec![DisplayTreeNode::leaf(id.segment("Variables"), "Variables")];

    match stage.stage_type() {
        StageType::Deployment => {
            let service = id.segment("Service");
            children.push(
                DisplayTreeNode::leaf(service.clone(), "Service")
                    .with_children(vec![
                        DisplayTreeNode::leaf(service.segment("Artifacts"), "Artifacts"),
                        DisplayTreeNode::leaf(service.segment("Manifests"), "Manifests"),
                        DisplayTreeNode::leaf(service.segment("Variables"), "Variables"),
                    ])
                    .expanded(),
            );
        }
        StageType::Ci => {
            children.push(DisplayTreeNode::leaf(id.segment("Dependencies"), "Dependencies"));
        }
        _ => {}
    }

    children.push(DisplayTreeNode::leaf(id.segment("Infrastructure"), "Infrastructure"));
    children.push(DisplayTreeNode::leaf(id.segment("Execution"), "Execution"));

    DisplayTreeNode::leaf(id, stage.name()).with_children(children)
}
