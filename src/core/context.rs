//! Resolution context - one variable resolution cycle

use crate::core::{
    config::PipelineDocument,
    metadata::{load_metadata, MetadataMap, VariableMergeResponse},
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use uuid::Uuid;

/// Everything one resolution round trip produced
///
/// A context is never mutated; a new cycle builds a new context and the old
/// one is dropped.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    /// Unique ID of this cycle
    pub cycle_id: Uuid,

    /// When the resolved payload was received
    pub received_at: DateTime<Utc>,

    /// The document as authored
    pub original: PipelineDocument,

    /// The same document with runtime fields replaced by lookup tokens
    pub resolved: PipelineDocument,

    /// Token -> provenance
    pub metadata: MetadataMap,
}

impl ResolutionContext {
    pub fn new(original: PipelineDocument, resolved: PipelineDocument, metadata: MetadataMap) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            received_at: Utc::now(),
            original,
            resolved,
            metadata,
        }
    }

    /// Build a context from the original document and a merge response
    pub fn from_response(original: PipelineDocument, response: VariableMergeResponse) -> Result<Self> {
        let resolved = PipelineDocument::parse(&response.yaml)
            .context("Failed to parse resolved pipeline from merge response")?;
        Ok(Self::new(original, resolved, response.metadata_map))
    }

    /// Load original, resolved and metadata from three files
    pub fn from_files(original: &Path, resolved: &Path, metadata: &Path) -> Result<Self> {
        let original = PipelineDocument::from_file(original)?;
        let resolved_yaml = std::fs::read_to_string(resolved)
            .with_context(|| format!("Failed to read {}", resolved.display()))?;
        let resolved = PipelineDocument::parse(&resolved_yaml)?;
        let metadata = load_metadata(metadata)?;
        Ok(Self::new(original, resolved, metadata))
    }

    /// Load original from a file and the rest from a merge response file
    pub fn from_response_file(original: &Path, response: &Path) -> Result<Self> {
        let original = PipelineDocument::from_file(original)?;
        let response = VariableMergeResponse::from_file(response)?;
        Self::from_response(original, response)
    }
}
