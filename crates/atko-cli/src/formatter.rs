//! Rich output formatting for CLI

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use atko_client::Resource;
use comfy_table::{Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::{CliError, CliResult};

/// Listings longer than this are abbreviated in table output unless `--all` is given
const TABLE_PREVIEW_THRESHOLD: usize = 10;
const TABLE_PREVIEW_ROWS: usize = 5;

/// Format and display output based on format preference
pub struct Formatter {
    format: OutputFormat,
    colored: bool,
}

impl Formatter {
    #[must_use]
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self { format, colored }
    }

    /// Display any serializable value
    pub fn display<T: Serialize + ?Sized>(&self, value: &T) -> CliResult<()> {
        match self.format {
            OutputFormat::Yaml => self.display_yaml(value),
            _ => self.display_json(value),
        }
    }

    /// Display users or groups, to stdout or to `file`
    pub fn display_resources<R: Resource>(
        &self,
        items: &[R],
        show_all: bool,
        file: Option<&Path>,
    ) -> CliResult<()> {
        let mut rendered = self.render_resources(items, show_all)?;
        if self.format == OutputFormat::Table {
            rendered.push_str(&format!("\n{} record(s)", items.len()));
        }
        match file {
            Some(path) => {
                std::fs::write(path, format!("{rendered}\n"))?;
                self.print_status(&format!(
                    "Wrote {} record(s) to {}",
                    items.len(),
                    path.display()
                ));
            }
            None => println!("{rendered}"),
        }
        Ok(())
    }

    /// Render users or groups in the selected format
    ///
    /// # Errors
    ///
    /// Serialization failures.
    pub fn render_resources<R: Resource>(&self, items: &[R], show_all: bool) -> CliResult<String> {
        match self.format {
            OutputFormat::Table => Ok(summary_table(items, show_all).to_string()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(items)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(items)?),
            OutputFormat::Csv => flattened_csv(items),
            OutputFormat::Id => Ok(items.iter().map(Resource::id).collect::<Vec<_>>().join(",")),
            // First summary column: login for users, name for groups
            OutputFormat::Login => Ok(items
                .iter()
                .map(|item| item.summary().into_iter().next().unwrap_or_default())
                .collect::<Vec<_>>()
                .join(",")),
        }
    }

    /// Display profile settings
    pub fn display_settings(&self, name: &str, settings: &BTreeMap<String, String>) -> CliResult<()> {
        match self.format {
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL)
                    .apply_modifier(UTF8_ROUND_CORNERS)
                    .set_header(vec!["Setting", "Value"]);
                for (key, value) in settings {
                    table.add_row(vec![key.as_str(), value.as_str()]);
                }
                self.print_header(&format!("Profile: {name}"));
                println!("{table}");
                Ok(())
            }
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(Vec::new());
                writer.write_record(["setting", "value"])?;
                for (key, value) in settings {
                    writer.write_record([key, value])?;
                }
                print!("{}", csv_text(writer)?);
                Ok(())
            }
            _ => self.display(&BTreeMap::from([(name, settings)])),
        }
    }

    /// Display profiles, with settings when `details` is set
    pub fn display_profiles(
        &self,
        profiles: &BTreeMap<String, BTreeMap<String, String>>,
        details: bool,
    ) -> CliResult<()> {
        match self.format {
            OutputFormat::Table | OutputFormat::Csv | OutputFormat::Id | OutputFormat::Login
                if !details =>
            {
                if profiles.is_empty() {
                    self.print_info("No profiles configured. Run `atko config init`");
                    return Ok(());
                }
                self.print_header("Profiles");
                for name in profiles.keys() {
                    self.print_item(name);
                }
                Ok(())
            }
            OutputFormat::Table => {
                for (name, settings) in profiles {
                    self.display_settings(name, settings)?;
                }
                Ok(())
            }
            _ if details => self.display(profiles),
            _ => self.display(&profiles.keys().collect::<Vec<_>>()),
        }
    }

    /// Display error with category and suggestions
    pub fn display_error(&self, error: &CliError) {
        let category = error.category();
        if self.colored {
            eprintln!(
                "{} {}: {}",
                "Error".bright_red().bold(),
                format!("[{category}]").bright_black(),
                error
            );

            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                eprintln!("\n{}", "Suggestions:".bright_yellow().bold());
                for suggestion in suggestions {
                    eprintln!("  {} {}", "•".bright_blue(), suggestion);
                }
            }
        } else {
            eprintln!("Error [{category}]: {error}");

            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                eprintln!("\nSuggestions:");
                for suggestion in suggestions {
                    eprintln!("  • {suggestion}");
                }
            }
        }
    }

    pub fn print_success(&self, text: &str) {
        if self.colored {
            eprintln!("{} {}", "✓".bright_green().bold(), text);
        } else {
            eprintln!("✓ {text}");
        }
    }

    pub fn print_warning(&self, text: &str) {
        if self.colored {
            eprintln!("{} {}", "!".bright_yellow().bold(), text.bright_yellow());
        } else {
            eprintln!("! {text}");
        }
    }

    /// Progress and confirmation lines; stderr keeps stdout parseable
    pub fn print_status(&self, text: &str) {
        if self.colored {
            eprintln!("{}", text.bright_black());
        } else {
            eprintln!("{text}");
        }
    }

    pub fn print_info(&self, text: &str) {
        if self.colored {
            println!("{}", text.bright_blue());
        } else {
            println!("{text}");
        }
    }

    // Internal formatting helpers

    fn display_json<T: Serialize + ?Sized>(&self, value: &T) -> CliResult<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn display_yaml<T: Serialize + ?Sized>(&self, value: &T) -> CliResult<()> {
        print!("{}", serde_yaml::to_string(value)?);
        Ok(())
    }

    fn print_header(&self, text: &str) {
        if self.colored {
            println!("\n{}", text.bright_cyan().bold());
        } else {
            println!("\n{text}");
        }
    }

    fn print_item(&self, text: &str) {
        if self.colored {
            println!("  {} {}", "•".bright_blue(), text.bright_green().bold());
        } else {
            println!("  • {text}");
        }
    }
}

fn summary_table<R: Resource>(items: &[R], show_all: bool) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(R::SUMMARY_HEADERS.to_vec());

    if show_all || items.len() <= TABLE_PREVIEW_THRESHOLD {
        for item in items {
            table.add_row(item.summary());
        }
    } else {
        let mut preview: Vec<Vec<String>> = items
            .iter()
            .take(TABLE_PREVIEW_ROWS)
            .map(Resource::summary)
            .collect();
        preview.sort();
        for row in preview {
            table.add_row(row);
        }
        for _ in 0..2 {
            table.add_row(vec!["..."; R::SUMMARY_HEADERS.len()]);
        }
    }
    table
}

/// Summary columns first, then every other attribute in name order
fn flattened_csv<R: Resource>(items: &[R]) -> CliResult<String> {
    let rows: Vec<BTreeMap<String, String>> = items.iter().map(Resource::flatten).collect();
    let mut columns: Vec<String> = R::SUMMARY_HEADERS
        .iter()
        .filter(|h| rows.iter().any(|row| row.contains_key(**h)))
        .map(|h| (*h).to_string())
        .collect();
    let extra: BTreeSet<String> = rows
        .iter()
        .flat_map(BTreeMap::keys)
        .filter(|key| !columns.contains(key))
        .cloned()
        .collect();
    columns.extend(extra);

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&columns)?;
    for row in &rows {
        writer.write_record(columns.iter().map(|c| row.get(c).map_or("", String::as_str)))?;
    }
    csv_text(writer)
}

fn csv_text(writer: csv::Writer<Vec<u8>>) -> CliResult<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| CliError::Other(format!("CSV output: {}", e.error())))?;
    String::from_utf8(bytes).map_err(|e| CliError::Other(format!("CSV output: {e}")))
}
