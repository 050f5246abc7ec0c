use anyhow::Result;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::generator::GenerationOutcome;
use crate::log::{LogEntry, LogLevel};
use crate::models::RuleDefinitionSource;

/// Render the run summary and the table of generated plugins.
pub fn render(package_id: &str, outcome: &GenerationOutcome, log: &[LogEntry], quiet: bool) -> Result<()> {
    let warn_count = log.iter().filter(|e| e.level == LogLevel::Warning).count();
    let error_count = log.iter().filter(|e| e.level == LogLevel::Error).count();
    let status = if outcome.success {
        "✓ success".green()
    } else {
        "✗ failed".red()
    };

    if quiet {
        println!(
            "{}  Plugins: {}  Warnings: {}  Errors: {}",
            status,
            outcome.artifacts.len(),
            warn_count.to_string().yellow(),
            error_count.to_string().red(),
        );
        return Ok(());
    }

    println!(
        "\n {} v{}",
        "analyzer-plugin-gen".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(" Package: {}\n", package_id);

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(" │  {:<48} │", format!("Result             : {}", status));
    println!(
        " │  {:<48} │",
        format!("Plugins generated  : {:>4}", outcome.artifacts.len())
    );
    println!(
        " │  {:<48} │",
        format!("{}  Warnings        : {:>4}", "⚠".yellow(), warn_count)
    );
    println!(
        " │  {:<48} │",
        format!("{}  Errors          : {:>4}", "✗".red(), error_count)
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    if !outcome.artifacts.is_empty() {
        println!(" {} Generated plugins:\n", "[OK]".green().bold());
        render_table(outcome);
        println!();
    }

    Ok(())
}

fn render_table(outcome: &GenerationOutcome) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Package").add_attribute(Attribute::Bold),
            Cell::new("Version").add_attribute(Attribute::Bold),
            Cell::new("Plugin key").add_attribute(Attribute::Bold),
            Cell::new("Rules").add_attribute(Attribute::Bold),
            Cell::new("Archive").add_attribute(Attribute::Bold),
        ]);

    for artifact in &outcome.artifacts {
        let rules_color = match artifact.rule_source {
            RuleDefinitionSource::UserSupplied => Color::Cyan,
            RuleDefinitionSource::AutoGeneratedTemplate => Color::DarkGrey,
        };

        table.add_row(vec![
            Cell::new(&artifact.package_id),
            Cell::new(artifact.package_version.to_string()),
            Cell::new(&artifact.plugin_key),
            Cell::new(artifact.rule_source.to_string()).fg(rules_color),
            Cell::new(artifact.archive_path.display().to_string()),
        ]);
    }

    println!("{}", table);
}
