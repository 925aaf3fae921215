//! Shallow variable walker
//!
//! Pairs one resolved node with its original counterpart and emits a row for
//! every own string field whose value is a known provenance token. Nested
//! fields are left to the caller (see `dispatch`).

use crate::core::metadata::MetadataMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::sync::OnceLock;
use tracing::trace;

/// Bookkeeping keys that never produce rows
pub const RESERVED_KEYS: &[&str] = &["__uuid"];

/// How the authored value is supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Literal value
    Fixed,
    /// `<+input>` placeholder filled at run time
    RuntimeInput,
    /// Any other `<+...>` expression
    Expression,
}

fn runtime_input_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*<\+input>").expect("valid regex"))
}

fn expression_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<\+[^>]+>").expect("valid regex"))
}

impl ValueKind {
    /// Classify an authored value
    pub fn classify(value: &str) -> Self {
        if runtime_input_regex().is_match(value) {
            ValueKind::RuntimeInput
        } else if expression_regex().is_match(value) {
            ValueKind::Expression
        } else {
            ValueKind::Fixed
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ValueKind::Fixed => "fixed",
            ValueKind::RuntimeInput => "runtime input",
            ValueKind::Expression => "expression",
        }
    }
}

/// One row of the variables table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRow {
    /// Fully qualified name of the field
    pub fqn: String,

    /// Display label
    pub local_name: String,

    /// Authored value ("" when the original has no counterpart)
    pub value: String,

    pub kind: ValueKind,

    /// The field is an output property
    pub output: bool,
}

/// Render an authored value for display
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Walk the own scalar fields of `resolved`
///
/// Only string values are treated as tokens. Tokens missing from `metadata`
/// are skipped silently, as are reserved keys and empty values.
pub fn walk(original: Option<&Mapping>, resolved: &Mapping, metadata: &MetadataMap) -> Vec<VariableRow> {
    let mut rows = Vec::new();

    for (key, value) in resolved {
        let Some(key) = key.as_str() else { continue };
        if RESERVED_KEYS.contains(&key) {
            continue;
        }
        let Some(token) = value.as_str() else { continue };
        if token.is_empty() {
            continue;
        }
        let Some(meta) = metadata.get(token) else {
            trace!(field = key, "No metadata for field");
            continue;
        };
        let Some(fqn) = meta.fqn() else { continue };

        let authored = original.and_then(|o| o.get(key));
        let value = display_value(authored);
        let kind = authored
            .and_then(Value::as_str)
            .map(ValueKind::classify)
            .unwrap_or(ValueKind::Fixed);

        rows.push(VariableRow {
            fqn: fqn.to_string(),
            local_name: meta.local_name().unwrap_or(key).to_string(),
            value,
            kind,
            output: meta.is_output(),
        });
    }

    rows
}

/// Walk two values that are expected to be mappings
///
/// Anything that is not a mapping on the resolved side produces no rows.
pub fn walk_value(original: Option<&Value>, resolved: Option<&Value>, metadata: &MetadataMap) -> Vec<VariableRow> {
    match resolved.and_then(Value::as_mapping) {
        Some(resolved) => walk(original.and_then(Value::as_mapping), resolved, metadata),
        None => Vec::new(),
    }
}

/// Descend into `value` along `keys`
pub fn descend<'a>(value: Option<&'a Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(value?, |current, key| current.get(*key))
}
