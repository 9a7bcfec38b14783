//! Check command - parse and validate a diagram.

use std::path::{Path, PathBuf};

use colored::Colorize;
use erdsmith::{CompileOptions, Severity};

use super::{format_issue, load_compiler, options_with_reserved};

pub fn run(
    file: PathBuf,
    json_output: bool,
    reserved: Option<PathBuf>,
    config: Option<&Path>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let compiler = load_compiler(config)?;
    let options = options_with_reserved(
        CompileOptions::default().without_fix().without_match(),
        reserved.as_ref(),
    )?;
    let result = compiler.compile_file(&file, &options)?;

    let errors = result
        .issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .count();

    if json_output {
        let report = serde_json::json!({
            "source": result.source,
            "issues": result.issues,
            "fix_previews": result.fix_previews,
            "summary": result.summary.initial,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} {}", "Checking".cyan().bold(), file.display().to_string().white());
        if verbose {
            println!(
                "  {} entities, {} relationships, {} lines ({})",
                result.source.entity_declarations,
                result.source.relationship_declarations,
                result.source.line_count,
                result.source.hash
            );
        }
        println!();

        if result.issues.is_empty() {
            println!("{}", "No issues found.".green().bold());
        } else {
            for issue in &result.issues {
                println!("{}", format_issue(issue, &result.fix_previews));
            }
            println!();

            let counts = result.summary.initial;
            println!(
                "{} errors, {} warnings, {} info; {} fixable",
                counts.error.to_string().red(),
                counts.warning.to_string().yellow(),
                counts.info.to_string().blue(),
                result.fix_previews.len().to_string().green()
            );
            if !result.fix_previews.is_empty() {
                println!(
                    "Run {} to apply fixes.",
                    format!("erdsmith fix {}", file.display()).cyan().bold()
                );
            }
        }
    }

    if errors > 0 {
        return Err(format!("{} error-level issues found", errors).into());
    }
    Ok(())
}
