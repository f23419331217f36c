//! Final result shapes for the CLI and the web API
//!
//! The CLI reports resurfaced history grouped by topic; the web API reports
//! new literature grouped by origin. Both are built from [`ScoredItem`]s.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::candidate::{Origin, ScoredItem};
use crate::cluster::{Cluster, ClusterSummary};

/// Message surfaced when the recent window holds nothing to profile
pub const EMPTY_SIGNAL_MESSAGE: &str = "Not enough recent history to build an interest profile.";

/// Round a score for presentation
pub fn round_score(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

/// One line of CLI output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CliRow {
    pub cluster: String,
    pub score: f64,
    pub last_visit: Option<DateTime<Utc>>,
    pub visits: Option<u32>,
    pub title: String,
    pub url: String,
    pub host: String,
    pub why_tokens: Vec<String>,
}

impl CliRow {
    pub fn why(&self) -> String {
        self.why_tokens.join(", ")
    }
}

/// One literature recommendation in the web response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebItem {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub why: String,
}

impl From<&ScoredItem> for WebItem {
    fn from(item: &ScoredItem) -> Self {
        let candidate = &item.candidate;
        Self {
            title: candidate.title.clone(),
            url: candidate.url.clone(),
            pdf_url: candidate.pdf_url().map(str::to_string),
            score: round_score(item.score),
            published: candidate.published.map(|p| p.to_string()),
            authors: candidate.authors.clone(),
            summary: candidate.summary.clone(),
            why: item.why_tokens.join(", "),
        }
    }
}

/// Web results partitioned by origin, each list capped independently
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewRecommendations {
    pub arxiv: Vec<WebItem>,
    pub crossref: Vec<WebItem>,
    pub semantic_scholar: Vec<WebItem>,
}

impl NewRecommendations {
    pub fn len(&self) -> usize {
        self.arxiv.len() + self.crossref.len() + self.semantic_scholar.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Body of a successful `POST /api/recommend`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebReport {
    pub interest_tokens: Vec<String>,
    pub topics: Vec<String>,
    pub queries: Vec<String>,
    pub warnings: Vec<String>,
    pub new_recommendations: NewRecommendations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Ok,
    /// Nothing in the recent window; no scoring happened
    EmptySignal,
}

/// Result of a local history run
#[derive(Debug, Clone, PartialEq)]
pub struct LocalReport {
    pub status: ReportStatus,
    pub interest_tokens: Vec<String>,
    pub clustered: bool,
    pub clusters: Vec<Cluster>,
    pub warnings: Vec<String>,
}

impl LocalReport {
    pub fn empty_signal(clustered: bool) -> Self {
        Self {
            status: ReportStatus::EmptySignal,
            interest_tokens: Vec::new(),
            clustered,
            clusters: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn item_count(&self) -> usize {
        self.clusters.iter().map(|c| c.items.len()).sum()
    }

    /// Status line for humans, if the run did not produce a normal result
    pub fn message(&self) -> Option<&'static str> {
        match self.status {
            ReportStatus::Ok => None,
            ReportStatus::EmptySignal => Some(EMPTY_SIGNAL_MESSAGE),
        }
    }

    pub fn summary_of(&self, cluster: &str) -> Option<&ClusterSummary> {
        self.clusters
            .iter()
            .find(|c| c.name == cluster)
            .map(|c| &c.summary)
    }
}

pub struct ResultAssembler;

impl ResultAssembler {
    /// Flatten clusters into rows, cluster by cluster
    pub fn flat_rows(clusters: &[Cluster]) -> Vec<CliRow> {
        clusters
            .iter()
            .flat_map(|cluster| {
                cluster.items.iter().map(move |item| CliRow {
                    cluster: cluster.name.clone(),
                    score: round_score(item.score),
                    last_visit: item.candidate.last_visit(),
                    visits: item.candidate.visit_count(),
                    title: item.candidate.title.clone(),
                    url: item.candidate.url.clone(),
                    host: item.candidate.host.clone(),
                    why_tokens: item.why_tokens.clone(),
                })
            })
            .collect()
    }

    /// Split ranked external items by origin, keeping at most `cap` per origin.
    ///
    /// Relative order within each origin is preserved.
    pub fn partition(items: &[ScoredItem], cap: usize) -> NewRecommendations {
        let take = |origin: Origin| -> Vec<WebItem> {
            items
                .iter()
                .filter(|i| i.candidate.origin == origin)
                .take(cap)
                .map(WebItem::from)
                .collect()
        };
        NewRecommendations {
            arxiv: take(Origin::Arxiv),
            crossref: take(Origin::Crossref),
            semantic_scholar: take(Origin::SemanticScholar),
        }
    }
}
