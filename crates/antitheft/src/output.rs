//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one line per item.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// "armed" / "disarmed", colored when enabled.
pub fn armed_label(armed: bool, color: bool) -> String {
    match (armed, color) {
        (true, true) => "armed".green().bold().to_string(),
        (false, true) => "disarmed".yellow().to_string(),
        (true, false) => "armed".into(),
        (false, false) => "disarmed".into(),
    }
}

/// "moving" / "still", colored when enabled.
pub fn moving_label(moving: bool, color: bool) -> String {
    match (moving, color) {
        (true, true) => "moving".red().bold().to_string(),
        (false, true) => "still".dimmed().to_string(),
        (true, false) => "moving".into(),
        (false, false) => "still".into(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `line_fn` on each item to emit one line per item
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
        OutputFormat::Plain => Ok(data.iter().map(&line_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item views don't use
/// the `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    line_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
        OutputFormat::Plain => Ok(line_fn(data)),
    }
}

/// Render one event of a live feed. Structured formats emit one compact
/// JSON document per line so the feed stays machine-readable.
pub fn render_event<T>(
    format: &OutputFormat,
    data: &T,
    line_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table | OutputFormat::Plain => Ok(line_fn(data)),
        OutputFormat::Json | OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
        OutputFormat::Yaml => Ok(format!("---\n{}", serde_yaml::to_string(data)?)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, Tabled)]
    struct Row {
        device: String,
        armed: bool,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                device: "bike".into(),
                armed: true,
            },
            Row {
                device: "car".into(),
                armed: false,
            },
        ]
    }

    fn same(r: &Row) -> Row {
        Row {
            device: r.device.clone(),
            armed: r.armed,
        }
    }

    #[test]
    fn plain_emits_one_line_per_item() {
        let out = render_list(&OutputFormat::Plain, &rows(), same, |r| r.device.clone()).unwrap();
        assert_eq!(out, "bike\ncar");
    }

    #[test]
    fn json_compact_is_single_line() {
        let out = render_list(&OutputFormat::JsonCompact, &rows(), same, |r| r.device.clone())
            .unwrap();
        assert_eq!(
            out,
            r#"[{"device":"bike","armed":true},{"device":"car","armed":false}]"#
        );
    }

    #[test]
    fn table_has_headers() {
        let out = render_list(&OutputFormat::Table, &rows(), same, |r| r.device.clone()).unwrap();
        assert!(out.contains("device"));
        assert!(out.contains("armed"));
        assert!(out.contains("bike"));
    }

    #[test]
    fn labels_are_plain_without_color() {
        assert_eq!(armed_label(true, false), "armed");
        assert_eq!(moving_label(false, false), "still");
    }
}
