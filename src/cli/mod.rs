//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{StepsCommand, TreeCommand, ValidateCommand, VariablesCommand};
use std::ffi::OsString;

/// Inspect resolved pipeline variables and navigation trees
#[derive(Debug, Parser, Clone)]
#[command(name = "pipeline-inspect")]
#[command(author = "Pipeline Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Inspect resolved pipeline variables, steps and navigation trees", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Validate a pipeline document
    Validate(ValidateCommand),

    /// Print the navigation tree of a pipeline
    Tree(TreeCommand),

    /// List the steps of a stage with their structural paths
    Steps(StepsCommand),

    /// Print resolved variables with provenance
    Variables(VariablesCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_tree_command() {
        let cli = Cli::try_parse_from(["pipeline-inspect", "tree", "--file", "p.yaml", "--json"]).unwrap();
        match cli.command {
            Command::Tree(cmd) => {
                assert_eq!(cmd.file, PathBuf::from("p.yaml"));
                assert!(cmd.json);
            }
            other => panic!("Expected tree command, got {:?}", other),
        }
    }

    #[test]
    fn test_variables_requires_a_source() {
        assert!(Cli::try_parse_from(["pipeline-inspect", "variables", "--file", "p.yaml"]).is_err());
        assert!(Cli::try_parse_from([
            "pipeline-inspect",
            "variables",
            "--file",
            "p.yaml",
            "--response",
            "r.json"
        ])
        .is_ok());
    }

    #[test]
    fn test_resolved_requires_metadata() {
        assert!(Cli::try_parse_from([
            "pipeline-inspect",
            "variables",
            "--file",
            "p.yaml",
            "--resolved",
            "r.yaml"
        ])
        .is_err());
    }

    #[test]
    fn test_global_verbose_flag() {
        let cli = Cli::try_parse_from(["pipeline-inspect", "validate", "-f", "p.yaml", "--verbose"]).unwrap();
        assert!(cli.verbose);
    }
}
