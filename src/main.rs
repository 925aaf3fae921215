use anyhow::{Context, Result};
use pipeline_inspect::cli::commands::{StepsCommand, TreeCommand, ValidateCommand, VariablesCommand};
use pipeline_inspect::cli::output::*;
use pipeline_inspect::cli::{Cli, Command};
use pipeline_inspect::core::{ExecutionNode, PathAddress, PipelineDocument, ResolutionContext};
use pipeline_inspect::error::ResolveError;
use pipeline_inspect::resolve::{collect_steps, project_tree, resolve_variables};
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG overrides the verbosity flag
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::Tree(cmd) => show_tree(cmd)?,
        Command::Steps(cmd) => show_steps(cmd)?,
        Command::Variables(cmd) => show_variables(cmd)?,
    }

    Ok(())
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    match PipelineDocument::from_file(&cmd.file) {
        Ok(document) => {
            println!("{} Pipeline document is valid!", CHECK);
            println!("  Name: {}", style(document.pipeline.name()).bold());
            println!("  Stages: {}", style(document.stage_count()).cyan());
            println!("  Steps: {}", style(document.step_count()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&document)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

fn show_tree(cmd: &TreeCommand) -> Result<()> {
    let document = PipelineDocument::from_file(&cmd.file).context("Failed to load pipeline")?;
    let tree = project_tree(&document);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        print!("{}", format_tree(&tree));
    }
    Ok(())
}

fn show_steps(cmd: &StepsCommand) -> Result<()> {
    let original = PipelineDocument::from_file(&cmd.file).context("Failed to load pipeline")?;
    let resolved = match &cmd.resolved {
        Some(path) => {
            let yaml = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Some(PipelineDocument::parse(&yaml).context("Failed to parse resolved pipeline")?)
        }
        None => None,
    };

    let original_stage = original.pipeline.find_stage(&cmd.stage);
    let no_steps = ExecutionNode::default();
    // With a resolved document, a stage or execution block missing from the
    // original still counts as an (empty) original so every step diverges
    let (stage, counterpart) = match &resolved {
        Some(doc) => (
            doc.pipeline.find_stage(&cmd.stage),
            Some(original_stage.and_then(|s| s.execution()).unwrap_or(&no_steps)),
        ),
        None => (original_stage, None),
    };
    let stage = stage.ok_or_else(|| ResolveError::StageNotFound(cmd.stage.clone()))?;
    let execution = stage
        .execution()
        .ok_or_else(|| ResolveError::NoExecution(cmd.stage.clone()))?;
    debug!(
        stage = %cmd.stage,
        with_original = counterpart.is_some(),
        original_stage_found = original_stage.is_some(),
        "Collecting steps"
    );

    let collection = collect_steps(execution, counterpart, &PathAddress::stage(&cmd.stage));

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&collection)?);
    } else {
        println!(
            "{} {} step(s) in {}",
            INFO,
            style(collection.len()).cyan(),
            style(stage.name()).bold()
        );
        for step in &collection.steps {
            println!("  {}", format_step(step));
        }
        for divergence in &collection.divergences {
            println!("  {}", format_divergence(divergence));
        }
    }

    if cmd.strict {
        collection.ensure_consistent()?;
    }
    Ok(())
}

fn show_variables(cmd: &VariablesCommand) -> Result<()> {
    let ctx = match (&cmd.resolved, &cmd.metadata, &cmd.response) {
        (Some(resolved), Some(metadata), _) => ResolutionContext::from_files(&cmd.file, resolved, metadata)?,
        (_, _, Some(response)) => ResolutionContext::from_response_file(&cmd.file, response)?,
        _ => anyhow::bail!("Either --resolved with --metadata, or --response is required"),
    };

    let mut report = resolve_variables(&ctx);
    if let Some(stage) = &cmd.stage {
        report.stages.retain(|s| &s.identifier == stage);
        if report.stages.is_empty() {
            return Err(ResolveError::StageNotFound(stage.clone()).into());
        }
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} {} ({} at {})",
        INFO,
        style(ctx.original.pipeline.name()).bold(),
        style(&ctx.cycle_id.to_string()[..8]).dim(),
        style(ctx.received_at.to_rfc3339()).dim()
    );
    print!("{}", format_section("Pipeline", &report.pipeline));
    print!("{}", format_section("Variables", &report.pipeline_variables));
    for stage in &report.stages {
        print!("{}", format_stage_variables(stage));
    }
    println!(
        "\n{} {} row(s)",
        CHECK,
        style(report.row_count()).cyan()
    );
    Ok(())
}
