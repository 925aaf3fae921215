//! Provenance metadata returned by the variable merge service

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Map from resolved-value token to its provenance record
pub type MetadataMap = HashMap<String, VariableMetadata>;

/// Naming properties of one resolved field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YamlProperties {
    /// Fully qualified name, e.g. `pipeline.stages.deploy.spec.infrastructure.environmentRef`
    pub fqn: String,

    /// Display-friendly short form
    #[serde(default)]
    pub local_name: Option<String>,

    #[serde(default)]
    pub variable_name: Option<String>,

    #[serde(rename = "aliasFQN", default)]
    pub alias_fqn: Option<String>,

    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

/// Provenance record for one token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableMetadata {
    #[serde(default)]
    pub yaml_properties: Option<YamlProperties>,

    #[serde(default)]
    pub yaml_output_properties: Option<YamlProperties>,

    #[serde(default)]
    pub yaml_extra_properties: Option<serde_json::Value>,
}

impl VariableMetadata {
    /// Shorthand for a plain (non-output) property record
    pub fn new(fqn: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            yaml_properties: Some(YamlProperties {
                fqn: fqn.into(),
                local_name: Some(local_name.into()),
                visible: true,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Shorthand for an output property record
    pub fn output(fqn: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            yaml_output_properties: Some(YamlProperties {
                fqn: fqn.into(),
                local_name: Some(local_name.into()),
                visible: true,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn properties(&self) -> Option<&YamlProperties> {
        self.yaml_properties
            .as_ref()
            .or(self.yaml_output_properties.as_ref())
    }

    /// Fully qualified name, if any properties are present
    pub fn fqn(&self) -> Option<&str> {
        self.properties().map(|p| p.fqn.as_str())
    }

    /// Local name, falling back to the last FQN segment
    pub fn local_name(&self) -> Option<&str> {
        let props = self.properties()?;
        match props.local_name.as_deref() {
            Some(name) if !name.is_empty() => Some(name),
            _ => props.fqn.rsplit('.').next(),
        }
    }

    /// True when only output properties describe this token
    pub fn is_output(&self) -> bool {
        self.yaml_properties.is_none() && self.yaml_output_properties.is_some()
    }

    pub fn has_extra_properties(&self) -> bool {
        self.yaml_extra_properties.is_some()
    }
}

/// Payload of one variable merge round trip
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableMergeResponse {
    /// Resolved pipeline YAML (runtime fields replaced by tokens)
    pub yaml: String,

    #[serde(default)]
    pub metadata_map: MetadataMap,
}

impl VariableMergeResponse {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid variable merge response")
    }
}

/// Load a metadata map from a JSON or YAML file (chosen by extension)
pub fn load_metadata<P: AsRef<Path>>(path: P) -> Result<MetadataMap> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yaml::from_str(&content).context("Invalid metadata YAML")
    } else {
        serde_json::from_str(&content).context("Invalid metadata JSON")
    }
}
