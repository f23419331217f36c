//! End-to-end recommendation runs for the CLI and the web API

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

use crate::aggregator::{AggregatorSettings, EnabledSources, ExternalAggregator};
use crate::assemble::{LocalReport, ReportStatus, ResultAssembler, WebReport, EMPTY_SIGNAL_MESSAGE};
use crate::cluster::Clusterer;
use crate::config::{RecommenderConfig, MAX_EXPLAIN_TOP};
use crate::error::{RecError, Result};
use crate::filter::ReadingFilter;
use crate::history::VisitRecord;
use crate::profile::{ProfileBuilder, RecencyWindow};
use crate::scorer::CandidateScorer;
use crate::sources::LiteratureSource;
use crate::topics::{TopicInference, TopicSuggestions};

/// Hosts handed to topic inference as context
const TOP_HOSTS: usize = 5;

/// Per-request knobs shared by both surfaces
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendOptions {
    pub recent_days: u32,
    /// `YYYY-MM-DD`, local midnight; replaces the window start
    pub since: Option<String>,
    pub limit: usize,
    pub min_visits: u32,
    pub dedupe_host: bool,
    pub reading_filter: bool,
    pub cluster: bool,
    pub exclude_hosts: Vec<String>,
    pub exclude_url_pattern: Option<String>,
    pub explain_top: usize,
    pub sources: EnabledSources,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self::from_config(&RecommenderConfig::default())
    }
}

impl RecommendOptions {
    pub fn from_config(config: &RecommenderConfig) -> Self {
        Self {
            recent_days: config.recent_days,
            since: None,
            limit: config.limit,
            min_visits: config.min_visits,
            dedupe_host: false,
            reading_filter: true,
            cluster: true,
            exclude_hosts: Vec::new(),
            exclude_url_pattern: None,
            explain_top: config.explain_top,
            sources: EnabledSources::all(),
        }
    }

    pub fn filter(&self) -> Result<ReadingFilter> {
        let pattern = self
            .exclude_url_pattern
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());
        ReadingFilter::new(self.reading_filter, &self.exclude_hosts, pattern)
    }

    pub fn window(&self, now: DateTime<Utc>) -> Result<RecencyWindow> {
        let since = match self.since.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Some(parse_since(text)?),
            _ => None,
        };
        Ok(RecencyWindow::new(now, self.recent_days, since))
    }

    fn explain_top(&self) -> usize {
        self.explain_top.min(MAX_EXPLAIN_TOP)
    }
}

/// Parse a `YYYY-MM-DD` date as local midnight
pub fn parse_since(text: &str) -> Result<DateTime<Utc>> {
    let invalid = || RecError::InvalidSince(text.to_string());
    let date = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|_| invalid())?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(invalid)
}

/// Runs the pipeline over an already-loaded history
#[derive(Debug, Clone, Default)]
pub struct Recommender {
    config: RecommenderConfig,
}

impl Recommender {
    pub fn new(config: RecommenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    /// Resurface older history pages that match recent interests
    pub fn recommend_local(
        &self,
        records: &[VisitRecord],
        options: &RecommendOptions,
        now: DateTime<Utc>,
    ) -> Result<LocalReport> {
        let filter = options.filter()?;
        let window = options.window(now)?;

        let profile = ProfileBuilder::new(window, &filter).build(records);
        if profile.is_empty() {
            tracing::info!("No recent history in window starting {}", window.start);
            return Ok(LocalReport::empty_signal(options.cluster));
        }

        let items = CandidateScorer::new(window, &filter)
            .min_visits(options.min_visits)
            .explain_top(options.explain_top())
            .dedupe_host(options.dedupe_host)
            .score(&profile, records);

        let clusters = Clusterer::new(options.cluster, options.limit)
            .summary_top(self.config.cluster_summary_top)
            .cluster(items);

        let report = LocalReport {
            status: ReportStatus::Ok,
            interest_tokens: profile.top_terms(self.config.interest_top),
            clustered: options.cluster,
            clusters,
            warnings: Vec::new(),
        };
        tracing::info!(
            "Recommended {} history pages in {} clusters",
            report.item_count(),
            report.clusters.len()
        );
        Ok(report)
    }

    /// Recommend new literature from the external sources.
    ///
    /// Topic inference and source failures end up in `warnings`; only bad
    /// input is an error.
    pub async fn recommend_new(
        &self,
        records: &[VisitRecord],
        options: &RecommendOptions,
        topics: &dyn TopicInference,
        sources: &[Arc<dyn LiteratureSource>],
        now: DateTime<Utc>,
    ) -> Result<WebReport> {
        let filter = options.filter()?;
        let window = options.window(now)?;

        let records: Vec<VisitRecord> = records
            .iter()
            .filter(|r| r.visit_count >= options.min_visits)
            .cloned()
            .collect();
        let builder = ProfileBuilder::new(window, &filter);
        let profile = builder.build(&records);
        if profile.is_empty() {
            return Ok(WebReport {
                warnings: vec![EMPTY_SIGNAL_MESSAGE.to_string()],
                ..WebReport::default()
            });
        }

        let mut report = WebReport {
            interest_tokens: profile.top_terms(self.config.interest_top),
            ..WebReport::default()
        };
        if !options.sources.any() {
            return Ok(report);
        }

        let top_hosts = builder.top_hosts(&records, TOP_HOSTS);
        let suggestions = match topics.infer(&report.interest_tokens, &top_hosts).await {
            Ok(suggestions) => suggestions,
            Err(e) => {
                tracing::warn!("Topic inference failed: {}", e);
                report
                    .warnings
                    .push(format!("Topic inference unavailable: {}", e));
                TopicSuggestions::default()
            }
        };

        let per_call = u32::try_from(options.limit.saturating_mul(4)).unwrap_or(u32::MAX);
        let mut settings = AggregatorSettings::from_config(&self.config.sources);
        settings.results_per_call = settings.results_per_call.max(per_call);
        settings.explain_top = options.explain_top();

        let aggregated = ExternalAggregator::new(sources.to_vec(), settings)
            .aggregate(&profile, &suggestions.queries, options.sources)
            .await;

        report.topics = suggestions.topics;
        report.queries = suggestions.queries;
        report.warnings.extend(aggregated.warnings);
        report.new_recommendations = ResultAssembler::partition(&aggregated.items, options.limit);
        Ok(report)
    }
}
