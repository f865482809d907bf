//! # End-of-Run Report
//!
//! Renders a [`RunOutcome`] for people: every notice and warning in the order
//! it was raised, then exactly one of
//!
//! - a success summary (files written, dependencies added, config keys set,
//!   tasks run),
//! - an abort summary (first fatal diagnostic, unapplied operations),
//! - a dry-run line when the pipeline stopped after finalizing.
//!
//! Also renders the planned operations for `--dry-run` and the unit
//! invocation tree for `--trace`.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::io;

use ptree::TreeItem;

use crate::error::Result;
use crate::mutation::{InvocationRecord, Operation, Severity};
use crate::output::{emoji, OutputConfig};
use crate::phases::orchestrator::RunOutcome;
use crate::phases::{position, PipelineState, Placement, PIPELINE_ORDER};
use crate::units::Registry;

/// Render the end-of-run report.
pub fn render(outcome: &RunOutcome, out: &OutputConfig) -> String {
    let mut report = String::new();

    for diagnostic in outcome.diagnostics.iter().filter(|d| !d.is_error()) {
        let marker = match diagnostic.severity {
            Severity::Notice => emoji(out, "ℹ️ ", "[NOTE]"),
            _ => emoji(out, "⚠️ ", "[WARN]"),
        };
        let _ = writeln!(report, "{} {}", marker, diagnostic);
    }
    if !report.is_empty() {
        report.push('\n');
    }

    match outcome.state {
        PipelineState::Done => render_success(&mut report, outcome, out),
        PipelineState::Aborted => render_abort(&mut report, outcome, out),
        _ => {
            let _ = writeln!(
                report,
                "{} Dry run: {} operation(s) planned, nothing was written",
                emoji(out, "🔎", "[DRY RUN]"),
                outcome.operations.len()
            );
        }
    }

    report
}

fn render_success(report: &mut String, outcome: &RunOutcome, out: &OutputConfig) {
    let Some(summary) = &outcome.summary else {
        return;
    };

    if summary.is_noop() {
        let _ = writeln!(
            report,
            "{} Nothing to change; the project is already set up",
            emoji(out, "✅", "[OK]")
        );
    } else {
        let _ = writeln!(report, "{} Install complete", emoji(out, "✅", "[OK]"));
        let _ = writeln!(report, "   {} file(s) written", summary.files_written.len());
        for path in &summary.files_written {
            let _ = writeln!(report, "     {}", path.display());
        }
    }

    if !summary.dependencies_added.is_empty() {
        let _ = writeln!(
            report,
            "   dependencies added: {}",
            summary.dependencies_added.join(", ")
        );
    }
    if !summary.config_keys_set.is_empty() {
        let _ = writeln!(
            report,
            "   {} config key(s) set",
            summary.config_keys_set.len()
        );
    }
    if !summary.skipped_creates.is_empty() {
        let _ = writeln!(
            report,
            "   {} existing file(s) left untouched",
            summary.skipped_creates.len()
        );
    }
    let tasks: Vec<_> = summary
        .deferred
        .iter()
        .map(|pending| pending.operation.to_string())
        .collect();
    if !tasks.is_empty() {
        let _ = writeln!(report, "   tasks: {}", tasks.join(", "));
    }
}

fn render_abort(report: &mut String, outcome: &RunOutcome, out: &OutputConfig) {
    let cross = emoji(out, "❌", "[ERROR]");

    if let Some(failure) = &outcome.failure {
        let _ = writeln!(report, "{} Commit failed: {}", cross, failure.error);
        let _ = writeln!(
            report,
            "   at `{}` from '{}'",
            failure.failed.operation, failure.failed.origin
        );
        if !failure.applied.files_written.is_empty() {
            let _ = writeln!(
                report,
                "   {} file(s) were already written and are left in place",
                failure.applied.files_written.len()
            );
        }
        let _ = writeln!(
            report,
            "   {} operation(s) not applied",
            failure.unapplied.len()
        );
        for pending in &failure.unapplied {
            let _ = writeln!(report, "     - {}", pending.operation);
        }
        return;
    }

    let errors: Vec<_> = outcome.diagnostics.iter().filter(|d| d.is_error()).collect();
    if let Some(first) = errors.first() {
        let _ = writeln!(report, "{} Aborted: {}", cross, first);
        if errors.len() > 1 {
            let _ = writeln!(report, "   ({} more error(s))", errors.len() - 1);
            for other in &errors[1..] {
                let _ = writeln!(report, "     - {}", other);
            }
        }
    } else {
        let _ = writeln!(report, "{} Aborted", cross);
    }
    let _ = writeln!(
        report,
        "   {} operation(s) not applied; nothing was written",
        outcome.operations.len()
    );
}

/// Planned operations as YAML, the effective configuration as JSON, then the
/// tasks that would run after Commit, for `--dry-run`.
pub fn render_plan(outcome: &RunOutcome) -> Result<String> {
    let mut plan = String::from("# operations\n");
    plan.push_str(&serde_yaml::to_string(&outcome.operations)?);
    plan.push_str("\n# configuration\n");
    plan.push_str(&serde_json::to_string_pretty(&outcome.config)?);
    plan.push('\n');

    let tasks = planned_tasks(outcome);
    if !tasks.is_empty() {
        plan.push_str("\n# tasks after commit\n");
        for task in tasks {
            let _ = writeln!(plan, "{}", task);
        }
    }
    Ok(plan)
}

/// Units in install order with their descriptions, for `--list-units`.
pub fn render_units(registry: &Registry) -> String {
    let width = PIPELINE_ORDER
        .iter()
        .map(|step| step.unit.len())
        .max()
        .unwrap_or_default();

    let mut listing = String::new();
    for step in PIPELINE_ORDER {
        let description = registry.get(step.unit).map_or("", |unit| unit.description());
        let _ = write!(listing, "{:width$}  {}", step.unit, description, width = width);
        if let Placement::ComposedBy { parent, option } = step.placement {
            let _ = write!(listing, " (composed by {} when {} is on)", parent, option);
        }
        listing.push('\n');
    }

    let extra: Vec<_> = registry.names().filter(|name| position(name).is_none()).collect();
    if !extra.is_empty() {
        let _ = writeln!(listing, "not in the install order: {}", extra.join(", "));
    }
    listing
}

/// Deferred tasks in the plan, in the order they will run.
pub fn planned_tasks(outcome: &RunOutcome) -> Vec<String> {
    outcome
        .operations
        .iter()
        .filter(|pending| matches!(pending.operation, Operation::DeferTask { .. }))
        .map(|pending| pending.operation.to_string())
        .collect()
}

/// Tree node structure for ptree visualization
#[derive(Clone, Debug, PartialEq)]
pub struct TreeNode {
    pub label: String,
    pub children: Vec<TreeNode>,
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &ptree::Style) -> io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Borrowed(&self.children)
    }
}

/// Unit invocation call tree, rooted at the install itself.
pub fn invocation_tree(invocations: &[InvocationRecord]) -> TreeNode {
    let mut index = 0;
    TreeNode {
        label: "install".to_string(),
        children: build_level(invocations, &mut index, 0),
    }
}

fn build_level(records: &[InvocationRecord], index: &mut usize, depth: usize) -> Vec<TreeNode> {
    let mut nodes = Vec::new();
    while let Some(record) = records.get(*index).filter(|r| r.depth == depth) {
        *index += 1;
        let children = build_level(records, index, depth + 1);
        nodes.push(TreeNode {
            label: invocation_label(record),
            children,
        });
    }
    nodes
}

fn invocation_label(record: &InvocationRecord) -> String {
    let mut label = record.unit.clone();
    if !record.args.is_empty() {
        label.push(' ');
        label.push_str(&record.args.join(" "));
    }
    let errors = record.diagnostics.iter().filter(|d| d.is_error()).count();
    let warnings = record
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();
    if errors > 0 {
        let _ = write!(label, " ({} error(s))", errors);
    } else if warnings > 0 {
        let _ = write!(label, " ({} warning(s))", warnings);
    }
    label
}
