//! CLI command definitions

use clap::{ArgGroup, Args};
use std::path::PathBuf;

/// Validate a pipeline document
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Print the navigation tree
#[derive(Debug, Args, Clone)]
pub struct TreeCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List the steps of one stage
#[derive(Debug, Args, Clone)]
pub struct StepsCommand {
    /// Path to pipeline YAML file (original)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Resolved pipeline YAML; steps are read from here when given
    #[arg(short, long)]
    pub resolved: Option<PathBuf>,

    /// Stage identifier
    #[arg(long)]
    pub stage: String,

    /// Fail when resolved and original disagree
    #[arg(long)]
    pub strict: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Print resolved variables
#[derive(Debug, Args, Clone)]
#[command(group(ArgGroup::new("source").required(true).args(["resolved", "response"])))]
pub struct VariablesCommand {
    /// Path to pipeline YAML file (original)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Resolved pipeline YAML
    #[arg(short, long, requires = "metadata")]
    pub resolved: Option<PathBuf>,

    /// Metadata map (JSON, or YAML by extension)
    #[arg(short, long)]
    pub metadata: Option<PathBuf>,

    /// Variable merge response (JSON with `yaml` and `metadataMap`)
    #[arg(long)]
    pub response: Option<PathBuf>,

    /// Only print rows of this stage
    #[arg(long)]
    pub stage: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
