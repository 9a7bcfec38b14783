//! Fix command - apply automatic fixes and write the fixed model.

use std::path::{Path, PathBuf};

use chrono::Utc;
use colored::Colorize;
use erdsmith::{AutoFix, CompileOptions, SchemaModel, SourceMetadata, ValidationIssue};
use serde::Serialize;

use super::{format_issue, load_compiler, options_with_reserved};

/// Contents of a fixed-model file.
#[derive(Serialize)]
struct FixedModelFile<'a> {
    generated_at: String,
    source: &'a SourceMetadata,
    model: &'a SchemaModel,
    applied_fixes: &'a [AutoFix],
    remaining_issues: &'a [ValidationIssue],
}

pub fn run(
    file: PathBuf,
    output: Option<PathBuf>,
    reserved: Option<PathBuf>,
    config: Option<&Path>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let compiler = load_compiler(config)?;
    let options = options_with_reserved(CompileOptions::default().without_match(), reserved.as_ref())?;
    let result = compiler.compile_file(&file, &options)?;

    println!("{} {}", "Fixing".cyan().bold(), file.display().to_string().white());
    println!();

    if result.applied_fixes.is_empty() {
        println!("{}", "Nothing to fix.".green());
    } else {
        println!("{}", "Applied fixes:".yellow().bold());
        for (i, fix) in result.applied_fixes.iter().enumerate() {
            if verbose {
                println!("  {:>3}. {} {}", i + 1, fix.kind.to_string().cyan(), fix.description);
            } else {
                println!("  {:>3}. {}", i + 1, fix.description);
            }
        }
    }
    println!();

    if !result.remaining_issues.is_empty() {
        println!("{}", "Remaining issues:".yellow().bold());
        for issue in &result.remaining_issues {
            println!("{}", format_issue(issue, &[]));
        }
        println!();
    }
    if !result.converged {
        println!(
            "{}",
            "Fixing stopped before every fixable issue was resolved.".red()
        );
    }

    let output_path = output.unwrap_or_else(|| {
        let mut p = file.clone();
        let stem = p.file_stem().unwrap_or_default().to_string_lossy().into_owned();
        p.set_file_name(format!("{}.fixed.json", stem));
        p
    });

    let contents = FixedModelFile {
        generated_at: Utc::now().to_rfc3339(),
        source: &result.source,
        model: &result.model,
        applied_fixes: &result.applied_fixes,
        remaining_issues: &result.remaining_issues,
    };
    std::fs::write(&output_path, serde_json::to_string_pretty(&contents)?)?;

    println!(
        "{} {}",
        "Fixed model written to".green(),
        output_path.display().to_string().white().bold()
    );
    println!("{}", result.summary.recommendation);

    Ok(())
}
