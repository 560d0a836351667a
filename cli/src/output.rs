//! Output formatting for plugin lifecycle commands
//!
//! This module provides different output formats for install/update/remove/list
//! results:
//! - Pretty: human-readable with colors and formatting
//! - Json: compact JSON output
//! - JsonPretty: pretty-printed JSON output
//! - Plain: one line per result, no color

use anyhow::Result;
use colored::*;
use costforge_registry::discovery::PluginInfo;
use costforge_registry::install::InstallOutcome;
use costforge_registry::update::UpdateOutcome;
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable pretty output with colors
    #[default]
    Pretty,
    /// Compact JSON output
    Json,
    /// Pretty-printed JSON output
    JsonPretty,
    /// Plain text, one line per result
    Plain,
}

#[derive(Serialize)]
struct InstallView<'a> {
    name: &'a str,
    version: &'a str,
    path: String,
}

/// Display the outcome of an install.
pub fn display_install_outcome(outcome: &InstallOutcome, format: OutputFormat) -> Result<()> {
    let view = InstallView {
        name: &outcome.name,
        version: &outcome.version,
        path: outcome.path.display().to_string(),
    };

    match format {
        OutputFormat::Pretty => {
            println!(
                "{} installed {} {} -> {}",
                "✓".green().bold(),
                outcome.name.bold(),
                outcome.version.cyan(),
                view.path.dimmed()
            );
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(&view)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Plain => println!("{} {} {}", outcome.name, outcome.version, view.path),
    }

    Ok(())
}

#[derive(Serialize)]
struct UpdateView<'a> {
    name: &'a str,
    old_version: &'a str,
    new_version: &'a str,
    up_to_date: bool,
}

/// Display the outcome of an update.
pub fn display_update_outcome(outcome: &UpdateOutcome, format: OutputFormat) -> Result<()> {
    let view = UpdateView {
        name: &outcome.name,
        old_version: &outcome.old_version,
        new_version: &outcome.new_version,
        up_to_date: outcome.was_up_to_date,
    };

    match format {
        OutputFormat::Pretty => {
            if outcome.was_up_to_date {
                println!(
                    "{} {} is already up to date ({})",
                    "=".yellow().bold(),
                    outcome.name.bold(),
                    outcome.new_version.cyan()
                );
            } else {
                println!(
                    "{} updated {} {} -> {}",
                    "✓".green().bold(),
                    outcome.name.bold(),
                    outcome.old_version.dimmed(),
                    outcome.new_version.cyan()
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(&view)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Plain => println!(
            "{} {} {} {}",
            outcome.name,
            outcome.old_version,
            outcome.new_version,
            up_to_date_label(outcome)
        ),
    }

    Ok(())
}

fn up_to_date_label(outcome: &UpdateOutcome) -> &'static str {
    if outcome.was_up_to_date {
        "up-to-date"
    } else {
        "updated"
    }
}

/// Display a successful removal.
pub fn display_removed(name: &str, format: OutputFormat) {
    match format {
        OutputFormat::Pretty => println!("{} removed {}", "✓".green().bold(), name.bold()),
        OutputFormat::Json => println!("{{\"name\":\"{name}\",\"removed\":true}}"),
        OutputFormat::JsonPretty => {
            println!("{{\n  \"name\": \"{name}\",\n  \"removed\": true\n}}")
        }
        OutputFormat::Plain => println!("{name} removed"),
    }
}

#[derive(Serialize)]
struct PluginListView<'a> {
    name: &'a str,
    version: &'a str,
    path: String,
}

/// Display the plugins currently discovered on disk.
pub fn display_plugin_list(plugins: &[PluginInfo], format: OutputFormat) -> Result<()> {
    let views: Vec<PluginListView> = plugins
        .iter()
        .map(|p| PluginListView {
            name: &p.name,
            version: &p.version,
            path: p.binary_path.display().to_string(),
        })
        .collect();

    match format {
        OutputFormat::Pretty => {
            if views.is_empty() {
                println!("{}", "No plugins installed".dimmed());
            } else {
                for v in &views {
                    println!("{} {} {}", v.name.bold(), v.version.cyan(), v.path.dimmed());
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(&views)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&views)?),
        OutputFormat::Plain => {
            for v in &views {
                println!("{} {} {}", v.name, v.version, v.path);
            }
        }
    }

    Ok(())
}

/// Display an error in a user-friendly way
pub fn display_error(error: &str, suggestion: Option<&str>) {
    eprintln!();
    eprintln!("{} {}", "Error:".red().bold(), error.red());
    if let Some(hint) = suggestion {
        eprintln!();
        eprintln!("{} {}", "Hint:".yellow().bold(), hint.yellow());
    }
    eprintln!();
}
