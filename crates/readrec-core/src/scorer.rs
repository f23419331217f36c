//! Scoring candidates against the interest profile

use std::collections::HashSet;

use crate::candidate::{rank, CandidateDocument, ScoredItem};
use crate::config::MAX_EXPLAIN_TOP;
use crate::filter::ReadingFilter;
use crate::history::VisitRecord;
use crate::profile::{InterestProfile, RecencyWindow};
use crate::text::term_vector;

/// Score one candidate. Shared by local and external scoring.
pub fn score_document(
    profile: &InterestProfile,
    candidate: CandidateDocument,
    explain_top: usize,
) -> ScoredItem {
    let vector = term_vector(candidate.terms());
    let score = profile.similarity(&vector);
    let why_tokens = profile.explain(&vector, explain_top.min(MAX_EXPLAIN_TOP));
    ScoredItem {
        candidate,
        score,
        why_tokens,
    }
}

/// Resurfaces older history pages that match current interests
#[derive(Debug, Clone)]
pub struct CandidateScorer<'a> {
    window: RecencyWindow,
    filter: &'a ReadingFilter,
    min_visits: u32,
    explain_top: usize,
    dedupe_host: bool,
}

impl<'a> CandidateScorer<'a> {
    pub fn new(window: RecencyWindow, filter: &'a ReadingFilter) -> Self {
        Self {
            window,
            filter,
            min_visits: 1,
            explain_top: MAX_EXPLAIN_TOP,
            dedupe_host: false,
        }
    }

    pub fn min_visits(mut self, min_visits: u32) -> Self {
        self.min_visits = min_visits;
        self
    }

    pub fn explain_top(mut self, explain_top: usize) -> Self {
        self.explain_top = explain_top;
        self
    }

    /// Keep only the best-scoring page per host
    pub fn dedupe_host(mut self, dedupe_host: bool) -> Self {
        self.dedupe_host = dedupe_host;
        self
    }

    fn eligible(&self, record: &VisitRecord) -> bool {
        self.window.precedes(record.visit_time)
            && record.visit_count >= self.min_visits
            && self.filter.allows(&record.host, &record.url, &record.title)
    }

    /// Score every eligible record, best first.
    ///
    /// Only pages last visited before the recent window are considered, and
    /// pages with no overlap with the profile are dropped. An empty profile
    /// yields no items.
    pub fn score(&self, profile: &InterestProfile, corpus: &[VisitRecord]) -> Vec<ScoredItem> {
        if profile.is_empty() {
            return Vec::new();
        }

        let mut items: Vec<ScoredItem> = corpus
            .iter()
            .filter(|r| self.eligible(r))
            .map(|r| score_document(profile, CandidateDocument::from_visit(r), self.explain_top))
            .filter(|item| item.score > 0.0)
            .collect();
        rank(&mut items);

        if self.dedupe_host {
            let mut seen = HashSet::new();
            items.retain(|item| seen.insert(item.candidate.host.clone()));
        }

        tracing::debug!("Scored {} local candidates", items.len());
        items
    }
}
