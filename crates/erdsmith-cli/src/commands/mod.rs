//! CLI command implementations.

pub mod check;
pub mod export;
pub mod fix;
pub mod matches;

use std::path::{Path, PathBuf};

use colored::{ColoredString, Colorize};
use erdsmith::{AutoFix, CompileOptions, CompilerConfig, ErdCompiler, OptionSet, Severity, ValidationIssue};
use tracing::debug;

/// Build a compiler from an optional TOML config.
pub fn load_compiler(config: Option<&Path>) -> Result<ErdCompiler, Box<dyn std::error::Error>> {
    let config = match config {
        Some(path) => {
            debug!(path = %path.display(), "Loading configuration");
            CompilerConfig::from_file(path)?
        }
        None => CompilerConfig::default(),
    };
    Ok(ErdCompiler::with_config(config))
}

/// Read reserved entity names, one per line. Blank lines and `#` comments are skipped.
pub fn read_reserved(path: &Path) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read reserved names {}: {}", path.display(), e))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect())
}

/// Read option sets from a JSON array.
pub fn read_choices(path: &Path) -> Result<Vec<OptionSet>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read option sets {}: {}", path.display(), e))?;
    Ok(serde_json::from_str(&content)?)
}

/// Options with the caller's reserved names applied.
pub fn options_with_reserved(
    options: CompileOptions,
    reserved: Option<&PathBuf>,
) -> Result<CompileOptions, Box<dyn std::error::Error>> {
    match reserved {
        Some(path) => Ok(options.with_reserved_names(read_reserved(path)?)),
        None => Ok(options),
    }
}

pub fn severity_tag(severity: Severity) -> ColoredString {
    let tag = format!("{:<7}", severity.label().to_uppercase());
    match severity {
        Severity::Error => tag.red().bold(),
        Severity::Warning => tag.yellow().bold(),
        Severity::Info => tag.blue(),
    }
}

/// Render one issue, with its fix preview when there is one.
pub fn format_issue(issue: &ValidationIssue, previews: &[AutoFix]) -> String {
    let location = match issue.line {
        Some(line) => format!("line {:<4}", line),
        None => " ".repeat(9),
    };
    let mut rendered = format!(
        "  {} {} {} {}",
        severity_tag(issue.severity),
        location.dimmed(),
        issue.kind.to_string().cyan(),
        issue.message
    );
    if let Some(fix) = previews.iter().find(|f| f.issue_id == issue.id) {
        rendered.push_str(&format!("\n{}{} {}", " ".repeat(19), "fix:".green(), fix.description));
    }
    rendered
}
