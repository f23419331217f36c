//! Interest profile construction
//!
//! The profile is a flat term-frequency vector over the titles and URL paths
//! of recently visited pages, each record weighted by `ln(1 + visits)`.
//! There is no document-frequency weighting: one user's short history is too
//! small a corpus for IDF to mean anything.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::filter::ReadingFilter;
use crate::history::VisitRecord;
use crate::text::{candidate_terms, cosine, heaviest_terms, top_contributors, TermVector};

/// The recent-interest window `[start, now]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl RecencyWindow {
    /// `since`, when given, replaces the `now - recent_days` lower bound.
    ///
    /// A window reaching past the earliest representable time starts there.
    pub fn new(now: DateTime<Utc>, recent_days: u32, since: Option<DateTime<Utc>>) -> Self {
        let start = since.unwrap_or_else(|| {
            Duration::try_days(i64::from(recent_days))
                .and_then(|span| now.checked_sub_signed(span))
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        });
        Self { start, end: now }
    }

    /// Visits at or after the window start count as recent
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start
    }

    /// Visits strictly before the window start are resurfacing candidates
    pub fn precedes(&self, t: DateTime<Utc>) -> bool {
        t < self.start
    }
}

/// Weighted term representation of recent reading
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterestProfile {
    weights: TermVector,
    record_count: usize,
}

impl InterestProfile {
    /// Build directly from weights (tests and callers with their own signal)
    pub fn from_weights(weights: TermVector) -> Self {
        let weights: TermVector = weights
            .into_iter()
            .filter(|(_, w)| w.is_finite() && *w > 0.0)
            .collect();
        let record_count = usize::from(!weights.is_empty());
        Self {
            weights,
            record_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Number of history records that contributed
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn weight(&self, term: &str) -> f64 {
        self.weights.get(term).copied().unwrap_or(0.0)
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn vector(&self) -> &TermVector {
        &self.weights
    }

    /// Heaviest terms, ties broken alphabetically
    pub fn top_terms(&self, n: usize) -> Vec<String> {
        heaviest_terms(&self.weights, n)
    }

    /// Cosine similarity between the profile and a candidate vector
    pub fn similarity(&self, doc: &TermVector) -> f64 {
        cosine(&self.weights, doc)
    }

    /// Terms of `doc` that contribute most to its similarity
    pub fn explain(&self, doc: &TermVector, top: usize) -> Vec<String> {
        top_contributors(&self.weights, doc, top)
    }
}

/// Turns the recent window of history into an [`InterestProfile`]
#[derive(Debug, Clone)]
pub struct ProfileBuilder<'a> {
    window: RecencyWindow,
    filter: &'a ReadingFilter,
}

impl<'a> ProfileBuilder<'a> {
    pub fn new(window: RecencyWindow, filter: &'a ReadingFilter) -> Self {
        Self { window, filter }
    }

    pub fn window(&self) -> RecencyWindow {
        self.window
    }

    /// Records inside the window that pass the reading filter and carry at
    /// least one term
    pub fn recent<'r>(&self, records: &'r [VisitRecord]) -> Vec<&'r VisitRecord> {
        records
            .iter()
            .filter(|r| self.window.contains(r.visit_time))
            .filter(|r| self.filter.allows(&r.host, &r.url, &r.title))
            .filter(|r| !candidate_terms(&r.title, Some(&r.url), None).is_empty())
            .collect()
    }

    pub fn build(&self, records: &[VisitRecord]) -> InterestProfile {
        let recent = self.recent(records);
        let mut weights = TermVector::new();

        for record in &recent {
            let record_weight = (1.0 + f64::from(record.visit_count.max(1))).ln();
            for term in candidate_terms(&record.title, Some(&record.url), None) {
                *weights.entry(term).or_insert(0.0) += record_weight;
            }
        }

        tracing::debug!(
            "Built interest profile: {} terms from {} recent records",
            weights.len(),
            recent.len()
        );

        InterestProfile {
            weights,
            record_count: recent.len(),
        }
    }

    /// Most visited hosts in the window, for topic inference context
    pub fn top_hosts(&self, records: &[VisitRecord], n: usize) -> Vec<String> {
        let mut visits: HashMap<&str, u64> = HashMap::new();
        for record in self.recent(records) {
            if !record.host.is_empty() {
                *visits.entry(record.host.as_str()).or_insert(0) += u64::from(record.visit_count);
            }
        }
        let mut ranked: Vec<(&str, u64)> = visits.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.into_iter().take(n).map(|(h, _)| h.to_string()).collect()
    }
}
