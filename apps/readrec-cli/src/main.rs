//! readrec - resurface pages from your own browser history
//!
//! Builds an interest profile from the last couple of weeks of Chrome
//! history and ranks older pages against it.

mod output;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use readrec_core::filter::parse_csv_list;
use readrec_core::history::expand_home;
use readrec_core::{
    resolve_history_path, ChromeHistoryReader, HistoryReader, RecError, RecommendOptions,
    Recommender, RecommenderConfig, ReportStatus,
};

use output::{Format, OutputError};

#[derive(Parser, Debug)]
#[command(name = "readrec", version, about = "Reading recommendations from your browser history")]
struct Cli {
    /// Path to a Chrome History database
    #[arg(long)]
    history: Option<String>,

    /// Chrome profile directory name (e.g. "Default", "Profile 1")
    #[arg(long)]
    profile: Option<String>,

    /// Maximum number of recommendations
    #[arg(long)]
    limit: Option<usize>,

    /// Days of history that define current interests
    #[arg(long)]
    recent_days: Option<u32>,

    /// Minimum total visits for a page to be recommended
    #[arg(long)]
    min_visits: Option<u32>,

    /// Keep only the best page per host
    #[arg(long)]
    dedupe_host: bool,

    /// Start the interest window at this date (YYYY-MM-DD, local time)
    #[arg(long)]
    since: Option<String>,

    /// Include login, auth and social pages
    #[arg(long)]
    no_reading_filter: bool,

    /// Comma-separated hosts to skip
    #[arg(long)]
    exclude_hosts: Option<String>,

    /// Regex; matching URLs are skipped
    #[arg(long)]
    exclude_url_pattern: Option<String>,

    /// Print a single flat list instead of clusters
    #[arg(long)]
    no_cluster: bool,

    /// Number of matching terms shown per item
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=5))]
    explain_top: Option<u8>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Configuration file (TOML)
    #[arg(long, env = "READREC_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Rec(#[from] RecError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

impl Cli {
    fn options(&self, config: &RecommenderConfig) -> RecommendOptions {
        let mut options = RecommendOptions::from_config(config);
        if let Some(limit) = self.limit {
            options.limit = limit;
        }
        if let Some(days) = self.recent_days {
            options.recent_days = days;
        }
        if let Some(min_visits) = self.min_visits {
            options.min_visits = min_visits;
        }
        if let Some(top) = self.explain_top {
            options.explain_top = usize::from(top);
        }
        options.since = self.since.clone();
        options.dedupe_host = self.dedupe_host;
        options.reading_filter = !self.no_reading_filter;
        options.cluster = !self.no_cluster;
        options.exclude_hosts = self
            .exclude_hosts
            .as_deref()
            .map(parse_csv_list)
            .unwrap_or_default();
        options.exclude_url_pattern = self.exclude_url_pattern.clone();
        options
    }

    fn history_path(&self) -> PathBuf {
        match self.history.as_deref() {
            Some(path) => expand_home(path),
            None => resolve_history_path(self.profile.as_deref()),
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = RecommenderConfig::load(cli.config.as_deref()).map_err(RecError::from)?;
    let options = cli.options(&config);
    let path = cli.history_path();
    tracing::debug!("Reading history from {}", path.display());

    let records = ChromeHistoryReader.read(&path)?;
    let report = Recommender::new(config).recommend_local(&records, &options, Utc::now())?;

    for warning in &report.warnings {
        eprintln!("warning: {}", warning);
    }
    if report.status == ReportStatus::EmptySignal && cli.format != Format::Table {
        if let Some(message) = report.message() {
            eprintln!("{}", message);
        }
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    output::render(&report, cli.format, &mut out)?;
    out.flush().map_err(OutputError::from)?;
    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "readrec",
            "--limit",
            "3",
            "--min-visits",
            "2",
            "--no-cluster",
            "--exclude-hosts",
            "a.com, b.com",
            "--explain-top",
            "2",
        ]);
        let options = cli.options(&RecommenderConfig::default());
        assert_eq!(options.limit, 3);
        assert_eq!(options.min_visits, 2);
        assert!(!options.cluster);
        assert!(options.reading_filter);
        assert_eq!(options.exclude_hosts, vec!["a.com", "b.com"]);
        assert_eq!(options.explain_top, 2);
        assert_eq!(options.recent_days, 14);
    }

    #[test]
    fn test_explain_top_range() {
        assert!(Cli::try_parse_from(["readrec", "--explain-top", "6"]).is_err());
        assert!(Cli::try_parse_from(["readrec", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_history_flag_wins() {
        let cli = Cli::parse_from(["readrec", "--history", "/tmp/History", "--profile", "Work"]);
        assert_eq!(cli.history_path(), PathBuf::from("/tmp/History"));
    }
}
