//! Fan-out search across the external literature sources
//!
//! Every enabled source runs its share of the query budget concurrently. A
//! shared semaphore bounds the calls in flight, and each call carries its own
//! timeout. Results are only merged once every call has settled, so a slow or
//! failing source never cancels the others. A failed call becomes a warning.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::Semaphore;

use crate::candidate::{rank, CandidateDocument, Origin, ScoredItem};
use crate::config::{SourcesConfig, MAX_EXPLAIN_TOP};
use crate::profile::InterestProfile;
use crate::scorer::score_document;
use crate::sources::{LiteratureSource, SourceError};
use crate::text::normalize_url;

/// Which external sources take part in a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnabledSources {
    pub arxiv: bool,
    pub crossref: bool,
    pub semantic_scholar: bool,
}

impl Default for EnabledSources {
    fn default() -> Self {
        Self::all()
    }
}

impl EnabledSources {
    pub fn all() -> Self {
        Self {
            arxiv: true,
            crossref: true,
            semantic_scholar: true,
        }
    }

    pub fn none() -> Self {
        Self {
            arxiv: false,
            crossref: false,
            semantic_scholar: false,
        }
    }

    pub fn contains(&self, origin: Origin) -> bool {
        match origin {
            Origin::Arxiv => self.arxiv,
            Origin::Crossref => self.crossref,
            Origin::SemanticScholar => self.semantic_scholar,
            Origin::LocalHistory => false,
        }
    }

    pub fn any(&self) -> bool {
        self.arxiv || self.crossref || self.semantic_scholar
    }
}

/// Limits for one aggregation run
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorSettings {
    /// Results requested from each call
    pub results_per_call: u32,
    /// Outbound calls allowed across all sources
    pub max_total_calls: usize,
    /// Calls allowed in flight at once
    pub max_in_flight: usize,
    pub call_timeout: Duration,
    pub explain_top: usize,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self::from_config(&SourcesConfig::default())
    }
}

impl AggregatorSettings {
    pub fn from_config(config: &SourcesConfig) -> Self {
        Self {
            results_per_call: config.results_per_call,
            max_total_calls: config.max_total_calls,
            max_in_flight: config.max_in_flight,
            call_timeout: Duration::from_secs(config.timeout_secs),
            explain_top: MAX_EXPLAIN_TOP,
        }
    }

    /// Queries the source at `index` (reporting order) may issue when
    /// `sources` share the budget.
    ///
    /// The remainder of the split goes to the earliest sources, so the sum
    /// over all sources never exceeds `max_total_calls`. Late sources can
    /// get zero when the budget is smaller than the source count.
    pub fn queries_for_source(&self, index: usize, sources: usize, queries: usize) -> usize {
        if index >= sources {
            return 0;
        }
        let base = self.max_total_calls / sources;
        let extra = usize::from(index < self.max_total_calls % sources);
        (base + extra).min(queries)
    }
}

/// Scored, deduplicated external results plus one warning per degraded source
#[derive(Debug, Clone, Default)]
pub struct Aggregated {
    pub items: Vec<ScoredItem>,
    pub warnings: Vec<String>,
}

impl Aggregated {
    /// Items that came from `origin`, in ranking order
    pub fn from_origin(&self, origin: Origin) -> impl Iterator<Item = &ScoredItem> {
        self.items
            .iter()
            .filter(move |item| item.candidate.origin == origin)
    }
}

/// Settled result of one source's share of the calls
struct SourceOutcome {
    origin: Origin,
    documents: Vec<CandidateDocument>,
    attempted: usize,
    failures: Vec<SourceError>,
}

impl SourceOutcome {
    fn warning(&self) -> Option<String> {
        let first = self.failures.first()?;
        let name = self.origin.display_name();
        if self.failures.len() == self.attempted {
            Some(format!("{} unavailable: {}", name, first))
        } else {
            Some(format!(
                "{}: {} of {} queries failed ({})",
                name,
                self.failures.len(),
                self.attempted,
                first
            ))
        }
    }
}

pub struct ExternalAggregator {
    sources: Vec<Arc<dyn LiteratureSource>>,
    settings: AggregatorSettings,
}

impl ExternalAggregator {
    pub fn new(sources: Vec<Arc<dyn LiteratureSource>>, settings: AggregatorSettings) -> Self {
        Self { sources, settings }
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// Query every enabled source, score against `profile`, and merge.
    ///
    /// An empty query list or no enabled source yields no items and no
    /// warnings.
    pub async fn aggregate(
        &self,
        profile: &InterestProfile,
        queries: &[String],
        enabled: EnabledSources,
    ) -> Aggregated {
        let queries: Vec<&str> = queries
            .iter()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .collect();

        let mut active: Vec<&Arc<dyn LiteratureSource>> = self
            .sources
            .iter()
            .filter(|s| enabled.contains(s.origin()))
            .collect();
        active.sort_by_key(|s| s.origin());

        if queries.is_empty() || active.is_empty() {
            return Aggregated::default();
        }

        let sources = active.len();
        let shares: Vec<(&Arc<dyn LiteratureSource>, usize)> = active
            .into_iter()
            .enumerate()
            .map(|(i, source)| {
                let share = self.settings.queries_for_source(i, sources, queries.len());
                (source, share)
            })
            .filter(|(source, share)| {
                if *share == 0 {
                    tracing::debug!("{} skipped: call budget exhausted", source.origin().id());
                }
                *share > 0
            })
            .collect();
        let semaphore = Semaphore::new(self.settings.max_in_flight.max(1));
        tracing::info!(
            "Querying {} of {} sources within a budget of {} calls",
            shares.len(),
            sources,
            self.settings.max_total_calls
        );

        let outcomes = join_all(
            shares
                .into_iter()
                .map(|(source, share)| self.run_source(&**source, &queries[..share], &semaphore)),
        )
        .await;

        let mut warnings = Vec::new();
        let mut scored = Vec::new();
        for outcome in outcomes {
            if let Some(warning) = outcome.warning() {
                tracing::warn!("{}", warning);
                warnings.push(warning);
            }
            scored.extend(
                outcome
                    .documents
                    .into_iter()
                    .map(|doc| score_document(profile, doc, self.settings.explain_top)),
            );
        }

        let mut items = dedupe_by_url(scored);
        rank(&mut items);
        Aggregated { items, warnings }
    }

    async fn run_source(
        &self,
        source: &dyn LiteratureSource,
        queries: &[&str],
        semaphore: &Semaphore,
    ) -> SourceOutcome {
        let calls = queries.iter().map(|query| async move {
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => return Err(SourceError::Parse("call limiter closed".to_string())),
            };
            tracing::debug!("{} search: {}", source.origin().id(), query);
            tokio::time::timeout(
                self.settings.call_timeout,
                source.search(query, self.settings.results_per_call),
            )
            .await
            .unwrap_or(Err(SourceError::Timeout))
        });

        let mut outcome = SourceOutcome {
            origin: source.origin(),
            documents: Vec::new(),
            attempted: queries.len(),
            failures: Vec::new(),
        };
        for result in join_all(calls).await {
            match result {
                Ok(docs) => outcome.documents.extend(docs),
                Err(e) => outcome.failures.push(e),
            }
        }
        outcome
    }
}

/// Collapse items sharing a normalized URL.
///
/// The higher score survives; on equal scores the earlier item does, which
/// is the earlier source in reporting order. Losing origins are recorded in
/// the survivor's `also_from`.
pub fn dedupe_by_url(items: Vec<ScoredItem>) -> Vec<ScoredItem> {
    let mut kept: Vec<ScoredItem> = Vec::with_capacity(items.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let key = normalize_url(&item.candidate.url);
        if key.is_empty() {
            continue;
        }
        match index.get(&key) {
            Some(&i) => {
                let loser_origin = if item.score > kept[i].score {
                    let previous = std::mem::replace(&mut kept[i], item);
                    for origin in previous.candidate.also_from() {
                        kept[i].candidate.note_also_from(*origin);
                    }
                    previous.candidate.origin
                } else {
                    item.candidate.origin
                };
                kept[i].candidate.note_also_from(loser_origin);
            }
            None => {
                index.insert(key, kept.len());
                kept.push(item);
            }
        }
    }
    kept
}
