use crate::cache::CacheStats;
use crate::pipeline::{RunSummary, StageState};
use colored::*;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, ContentArrangement, Table};
use std::env;
use std::io::IsTerminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Auto,   // Detect based on terminal
    Always, // Force colors on
    Never,  // Force colors off
}

impl ColorMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            _ => None,
        }
    }

    pub fn should_use_color(&self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => detect_color_support(),
        }
    }

    /// Honour `NO_COLOR`, `CLICOLOR=0` and `CLICOLOR_FORCE=1`.
    pub fn from_env() -> Self {
        let mut mode = Self::Auto;

        if env::var("NO_COLOR").is_ok() {
            mode = Self::Never;
        }
        if let Ok(val) = env::var("CLICOLOR") {
            if val == "0" {
                mode = Self::Never;
            }
        }
        if let Ok(val) = env::var("CLICOLOR_FORCE") {
            if val == "1" {
                mode = Self::Always;
            }
        }
        mode
    }
}

pub trait OutputFormatter {
    fn success(&self, text: &str) -> String;
    fn error(&self, text: &str) -> String;
    fn warning(&self, text: &str) -> String;
    fn header(&self, text: &str) -> String;
    fn dim(&self, text: &str) -> String;
}

pub struct ColoredFormatter {
    color: ColorMode,
}

impl ColoredFormatter {
    pub fn new(color: ColorMode) -> Self {
        colored::control::set_override(color.should_use_color());
        Self { color }
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> ColoredString) -> String {
        if self.color.should_use_color() {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }
}

impl OutputFormatter for ColoredFormatter {
    fn success(&self, text: &str) -> String {
        self.paint(text, |t| t.green())
    }

    fn error(&self, text: &str) -> String {
        self.paint(text, |t| t.red())
    }

    fn warning(&self, text: &str) -> String {
        self.paint(text, |t| t.yellow())
    }

    fn header(&self, text: &str) -> String {
        self.paint(text, |t| t.blue().bold())
    }

    fn dim(&self, text: &str) -> String {
        self.paint(text, |t| t.dimmed())
    }
}

pub struct PlainFormatter;

impl OutputFormatter for PlainFormatter {
    fn success(&self, text: &str) -> String {
        text.to_string()
    }

    fn error(&self, text: &str) -> String {
        text.to_string()
    }

    fn warning(&self, text: &str) -> String {
        text.to_string()
    }

    fn header(&self, text: &str) -> String {
        text.to_string()
    }

    fn dim(&self, text: &str) -> String {
        text.to_string()
    }
}

fn detect_color_support() -> bool {
    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }
    std::io::stdout().is_terminal()
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(Cell::new));
    table
}

/// Per-stage table followed by fetch counters.
pub fn render_run_summary(summary: &RunSummary, fmt: &dyn OutputFormatter) -> String {
    let mut table = new_table(&[
        "stage", "status", "succeeded", "failed", "skipped", "warnings", "records",
    ]);

    for report in &summary.stages {
        let label = report.status_label();
        let status = match report.state {
            StageState::Completed => fmt.success(&label),
            StageState::Aborted => fmt.error(&label),
            StageState::Pending | StageState::Running => fmt.warning(&label),
        };
        let counts = report.result.as_ref().map_or([0; 5], |r| {
            [
                r.succeeded,
                r.failed,
                r.skipped,
                r.warnings.len(),
                r.records_upserted,
            ]
        });
        let mut row = vec![Cell::new(report.stage), Cell::new(status)];
        row.extend(counts.iter().map(Cell::new));
        table.add_row(row);
    }

    let mut out = format!("{}\n{}\n", fmt.header("Run summary"), table);
    for report in &summary.stages {
        if let Some(aborted) = report.result.as_ref().and_then(|r| r.aborted.as_ref()) {
            out.push_str(&fmt.error(&format!("{}\n", aborted)));
        }
    }
    out.push_str(&fmt.dim(&format!(
        "{} network requests, {} cache hits, {} retries, {} cache write failures in {:.2}s\n",
        summary.fetch.network_requests,
        summary.fetch.cache_hits,
        summary.fetch.retries,
        summary.fetch.cache_write_failures,
        summary.duration.as_secs_f64()
    )));
    out
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

pub fn render_cache_stats(stats: &[CacheStats]) -> String {
    let mut table = new_table(&["partition", "entries", "oldest", "newest", "size"]);
    let timestamp = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    for partition in stats {
        table.add_row(vec![
            Cell::new(&partition.partition),
            Cell::new(partition.entries),
            Cell::new(timestamp(partition.oldest)),
            Cell::new(timestamp(partition.newest)),
            Cell::new(human_bytes(partition.size_bytes)),
        ]);
    }
    table.to_string()
}
