//! Terminal styling for command output.

use colored::Colorize;
use hookscope_audit::{HookTrace, TraceFile};

/// Width of the horizontal rule between report sections.
const RULE_WIDTH: usize = 50;

/// Output styles shared by the commands.
pub(crate) struct Theme;

impl Theme {
    /// Section title.
    pub(crate) fn title(text: &str) -> String {
        text.bold().cyan().to_string()
    }

    /// Nothing to review.
    pub(crate) fn clean(text: &str) -> String {
        format!("{} {text}", "✓".green())
    }

    /// Something the reader should look at.
    pub(crate) fn attention(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Secondary detail.
    pub(crate) fn muted(text: &str) -> String {
        text.dimmed().to_string()
    }

    pub(crate) fn rule() -> String {
        "━".repeat(RULE_WIDTH).dimmed().to_string()
    }

    /// `name@version` when both are known, else `fallback`.
    pub(crate) fn package_id(
        name: Option<&str>,
        version: Option<&str>,
        fallback: &str,
    ) -> String {
        match (name, version) {
            (Some(n), Some(v)) => format!("{n}@{v}"),
            _ => fallback.to_string(),
        }
    }

    /// One traced hook: name, command, runtime and file count.
    pub(crate) fn hook_summary(hook: &HookTrace) -> String {
        format!(
            "{} {} ({}ms, {} trace file(s))",
            hook.hook.to_string().bold(),
            hook.command.dimmed(),
            hook.runtime_ms,
            hook.trace_files.len()
        )
    }

    /// An indented trace file line with its process id and size.
    pub(crate) fn trace_file(file: &TraceFile) -> String {
        format!(
            "    {} {}",
            file.path.display(),
            format!("[pid {}, {} bytes]", file.pid, file.size).dimmed()
        )
    }
}
