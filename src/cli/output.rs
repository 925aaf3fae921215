//! CLI output formatting

use crate::resolve::{
    CollectedStep, DisplayTreeNode, Divergence, StageVariables, ValueKind, VariableRow,
};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");

/// Format a navigation forest as an indented outline
pub fn format_tree(nodes: &[DisplayTreeNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, 0, &mut out);
    }
    out
}

fn write_node(node: &DisplayTreeNode, depth: usize, out: &mut String) {
    let marker = if node.children.is_empty() {
        "-"
    } else if node.expanded {
        "▾"
    } else {
        "▸"
    };
    out.push_str(&format!(
        "{}{} {} {}\n",
        "  ".repeat(depth),
        marker,
        style(&node.label).bold(),
        style(node.id.as_str()).dim()
    ));
    for child in &node.children {
        write_node(child, depth + 1, out);
    }
}

/// Format a value kind tag
pub fn format_kind(kind: ValueKind) -> String {
    match kind {
        ValueKind::Fixed => style(kind.label()).dim().to_string(),
        ValueKind::RuntimeInput => style(kind.label()).yellow().to_string(),
        ValueKind::Expression => style(kind.label()).cyan().to_string(),
    }
}

/// Format a single variable row
pub fn format_row(row: &VariableRow) -> String {
    let output = if row.output {
        format!(" {}", style("[output]").magenta())
    } else {
        String::new()
    };
    format!(
        "{} = {} ({}){}\n      {}",
        style(&row.local_name).bold(),
        row.value,
        format_kind(row.kind),
        output,
        style(&row.fqn).dim()
    )
}

/// Format a titled block of rows; empty sections are omitted
pub fn format_section(title: &str, rows: &[VariableRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let mut out = format!("  {}\n", style(title).underlined());
    for row in rows {
        out.push_str(&format!("    {}\n", format_row(row)));
    }
    out
}

/// Format all sections of one stage
pub fn format_stage_variables(stage: &StageVariables) -> String {
    let mut out = format!(
        "{} {} {}\n",
        INFO,
        style(&stage.name).bold(),
        style(stage.address.as_str()).dim()
    );
    out.push_str(&format_section("Stage", &stage.rows));
    out.push_str(&format_section("Variables", &stage.variables));
    out.push_str(&format_section("Service", &stage.service));
    out.push_str(&format_section("Dependencies", &stage.dependencies));
    out.push_str(&format_section("Infrastructure", &stage.infrastructure));
    for step in &stage.steps {
        out.push_str(&format_section(
            &format!("{} ({}) {}", step.name, step.step_type, step.path),
            &step.rows,
        ));
    }
    for divergence in &stage.divergences {
        out.push_str(&format!("  {}\n", format_divergence(divergence)));
    }
    out
}

/// Format one collected step
pub fn format_step(step: &CollectedStep<'_>) -> String {
    let original = match step.original {
        Some(_) => style("matched").green().to_string(),
        None => style("no original").yellow().to_string(),
    };
    let rollback = if step.rollback {
        format!(" {}", style("[rollback]").dim())
    } else {
        String::new()
    };
    format!(
        "{} {} {} {}{}\n      {}",
        style(step.identifier()).cyan(),
        style(&step.path).bold(),
        step.resolved.step_type(),
        original,
        rollback,
        style(step.address.as_str()).dim()
    )
}

pub fn format_divergence(divergence: &Divergence) -> String {
    format!("{} {}", WARN, style(divergence).yellow())
}
