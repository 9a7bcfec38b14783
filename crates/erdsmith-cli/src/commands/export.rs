//! Export command - run the full pipeline and export the schema.

use std::path::{Path, PathBuf};

use colored::Colorize;
use erdsmith::CompileOptions;

use super::{format_issue, load_compiler, options_with_reserved, read_choices};
use crate::cli::OutputFormat;

pub fn run(
    file: PathBuf,
    output: Option<PathBuf>,
    format: OutputFormat,
    choices: Option<PathBuf>,
    reserved: Option<PathBuf>,
    config: Option<&Path>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let compiler = load_compiler(config)?;
    let mut options = options_with_reserved(CompileOptions::default().without_match(), reserved.as_ref())?;
    if let Some(path) = choices {
        options = options.with_option_sets(read_choices(&path)?);
    }
    let result = compiler.compile_file(&file, &options)?;

    let rendered = match format {
        OutputFormat::Json => result.export.to_json()?,
        OutputFormat::Csv => result.export.to_csv()?,
    };

    // Diagnostics go to stderr so stdout stays clean for the schema
    for issue in result.remaining_issues.iter().chain(result.export.issues.iter()) {
        if verbose || issue.severity == erdsmith::Severity::Error {
            eprintln!("{}", format_issue(issue, &[]));
        }
    }

    match output {
        Some(path) => {
            std::fs::write(&path, rendered)?;
            eprintln!(
                "{} {} ({} entities, {} fixes applied)",
                "Exported".green(),
                path.display().to_string().white().bold(),
                result.export.entities.len(),
                result.applied_fixes.len()
            );
        }
        None => print!("{}", rendered),
    }

    if !result.is_clean() {
        return Err(format!(
            "schema exported with {} unresolved errors",
            result.errors().count()
        )
        .into());
    }
    Ok(())
}
