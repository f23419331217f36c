//! table, csv and json renderings of a local report

use std::io::Write;

use chrono::{DateTime, Local, Utc};
use clap::ValueEnum;
use comfy_table::{presets, Table};
use serde::Serialize;
use thiserror::Error;

use readrec_core::{CliRow, ClusterSummary, LocalReport, ResultAssembler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Table,
    Json,
    Csv,
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
}

const HEADERS: [&str; 6] = ["score", "last_visit", "visits", "title", "url", "why"];

/// A row as printed: every field already rendered
#[derive(Debug, Serialize)]
struct DisplayRow {
    score: String,
    last_visit: String,
    visits: String,
    title: String,
    url: String,
    host: String,
    why: String,
    why_tokens: Vec<String>,
    cluster: String,
}

impl From<&CliRow> for DisplayRow {
    fn from(row: &CliRow) -> Self {
        Self {
            score: format!("{:.3}", row.score),
            last_visit: row.last_visit.map(local_date).unwrap_or_default(),
            visits: row.visits.map(|v| v.to_string()).unwrap_or_default(),
            title: row.title.clone(),
            url: row.url.clone(),
            host: row.host.clone(),
            why: row.why(),
            why_tokens: row.why_tokens.clone(),
            cluster: row.cluster.clone(),
        }
    }
}

impl DisplayRow {
    fn cells(&self) -> [&str; 6] {
        [
            self.score.as_str(),
            self.last_visit.as_str(),
            self.visits.as_str(),
            self.title.as_str(),
            self.url.as_str(),
            self.why.as_str(),
        ]
    }
}

fn local_date(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

/// `top: a, b; items: N`, or `items: N` with no tokens
fn summary_text(summary: &ClusterSummary, separator: &str) -> String {
    if summary.top_tokens.is_empty() {
        format!("items: {}", summary.count)
    } else {
        format!(
            "top: {}{} items: {}",
            summary.top_tokens.join(", "),
            separator,
            summary.count
        )
    }
}

pub fn render<W: Write>(report: &LocalReport, format: Format, out: &mut W) -> Result<(), OutputError> {
    match format {
        Format::Table => render_table(report, out),
        Format::Csv => render_csv(report, out),
        Format::Json => render_json(report, out),
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::ASCII_HORIZONTAL_ONLY);
    table.set_header(HEADERS);
    table
}

fn render_table<W: Write>(report: &LocalReport, out: &mut W) -> Result<(), OutputError> {
    if let Some(message) = report.message() {
        writeln!(out, "{}", message)?;
        return Ok(());
    }
    if report.item_count() == 0 {
        writeln!(out, "No recommendations found.")?;
        return Ok(());
    }

    if !report.clustered {
        let mut table = new_table();
        for row in ResultAssembler::flat_rows(&report.clusters) {
            table.add_row(DisplayRow::from(&row).cells());
        }
        writeln!(out, "{}", table)?;
        return Ok(());
    }

    for cluster in &report.clusters {
        writeln!(out, "# {} ({})", cluster.name, summary_text(&cluster.summary, ","))?;
        let mut table = new_table();
        for row in ResultAssembler::flat_rows(std::slice::from_ref(cluster)) {
            table.add_row(DisplayRow::from(&row).cells());
        }
        writeln!(out, "{}\n", table)?;
    }
    Ok(())
}

fn render_csv<W: Write>(report: &LocalReport, out: &mut W) -> Result<(), OutputError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "cluster",
        "cluster_summary",
        "score",
        "last_visit",
        "visits",
        "title",
        "url",
        "why",
    ])?;
    for cluster in &report.clusters {
        let summary = summary_text(&cluster.summary, ";");
        for row in ResultAssembler::flat_rows(std::slice::from_ref(cluster)) {
            let row = DisplayRow::from(&row);
            let [score, last_visit, visits, title, url, why] = row.cells();
            writer.write_record([
                row.cluster.as_str(),
                summary.as_str(),
                score,
                last_visit,
                visits,
                title,
                url,
                why,
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct JsonCluster<'a> {
    name: &'a str,
    summary: &'a ClusterSummary,
    items: Vec<DisplayRow>,
}

fn render_json<W: Write>(report: &LocalReport, out: &mut W) -> Result<(), OutputError> {
    let payload = if report.clustered {
        let clusters: Vec<JsonCluster<'_>> = report
            .clusters
            .iter()
            .map(|cluster| JsonCluster {
                name: &cluster.name,
                summary: &cluster.summary,
                items: ResultAssembler::flat_rows(std::slice::from_ref(cluster))
                    .iter()
                    .map(DisplayRow::from)
                    .collect(),
            })
            .collect();
        serde_json::json!({ "clusters": clusters })
    } else {
        let items: Vec<DisplayRow> = ResultAssembler::flat_rows(&report.clusters)
            .iter()
            .map(DisplayRow::from)
            .collect();
        serde_json::json!({ "items": items })
    };
    serde_json::to_writer_pretty(&mut *out, &payload)?;
    writeln!(out)?;
    Ok(())
}
