//! Match command - suggest standard entities.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use erdsmith::{CompileOptions, StandardCatalog};

use super::load_compiler;

pub fn run(
    file: PathBuf,
    catalog: Option<PathBuf>,
    json_output: bool,
    config: Option<&Path>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let compiler = load_compiler(config)?;
    let mut options = CompileOptions::default();
    if let Some(path) = catalog {
        let json = std::fs::read_to_string(&path)
            .map_err(|e| format!("Cannot read catalog {}: {}", path.display(), e))?;
        options = options.with_catalog(Arc::new(StandardCatalog::from_json(&json)?));
    }
    let result = compiler.compile_file(&file, &options)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result.matches)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "Standard entity candidates for".cyan().bold(),
        file.display().to_string().white()
    );
    println!();

    for (entity, candidates) in &result.matches {
        println!("{}", entity.white().bold());
        if candidates.is_empty() {
            println!("  {}", "no candidates".dimmed());
            continue;
        }
        for candidate in candidates {
            let confidence = format!("{:.0}%", candidate.confidence * 100.0);
            let confidence = if candidate.confidence >= 0.8 {
                confidence.green()
            } else if candidate.confidence >= 0.5 {
                confidence.yellow()
            } else {
                confidence.red()
            };
            println!(
                "  {:>5}  {} ({})",
                confidence,
                candidate.candidate_name,
                candidate.candidate_id.dimmed()
            );
            if verbose {
                println!(
                    "         name {:.2}, attributes {:.2}",
                    candidate.name_score, candidate.attribute_score
                );
                if !candidate.overlapping_attributes.is_empty() {
                    println!("         overlap: {}", candidate.overlapping_attributes.join(", "));
                }
            }
        }
    }

    Ok(())
}
