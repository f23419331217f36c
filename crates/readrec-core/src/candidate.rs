//! Candidate documents and their scored form

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::history::VisitRecord;
use crate::text::{candidate_terms, host_of};

/// Where a candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    LocalHistory,
    Arxiv,
    Crossref,
    SemanticScholar,
}

impl Origin {
    /// The three external literature sources, in reporting order
    pub const EXTERNAL: [Origin; 3] = [Origin::Arxiv, Origin::Crossref, Origin::SemanticScholar];

    pub fn id(&self) -> &'static str {
        match self {
            Origin::LocalHistory => "local_history",
            Origin::Arxiv => "arxiv",
            Origin::Crossref => "crossref",
            Origin::SemanticScholar => "semantic_scholar",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Origin::LocalHistory => "Browser history",
            Origin::Arxiv => "arXiv",
            Origin::Crossref => "Crossref",
            Origin::SemanticScholar => "Semantic Scholar",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A publication date with whatever precision the source gave
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublishedDate {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl PublishedDate {
    pub fn year(year: i32) -> Self {
        Self {
            year,
            month: None,
            day: None,
        }
    }

    /// Parse `YYYY`, `YYYY-MM`, `YYYY-MM-DD` or an RFC 3339 timestamp
    pub fn parse(text: &str) -> Option<Self> {
        let date_part = text.trim().split('T').next()?;
        let mut parts = date_part.split('-');
        let year: i32 = parts.next()?.trim().parse().ok()?;
        let month = parts.next().and_then(|m| m.parse().ok()).filter(|m| (1..=12).contains(m));
        let day = month
            .and(parts.next())
            .and_then(|d| d.parse().ok())
            .filter(|d| (1..=31).contains(d));
        Some(Self { year, month, day })
    }

    /// Build from Crossref-style `date-parts` (`[year, month?, day?]`)
    pub fn from_parts(parts: &[i32]) -> Option<Self> {
        let year = *parts.first()?;
        let month = parts.get(1).and_then(|m| u32::try_from(*m).ok());
        let day = month.and(parts.get(2)).and_then(|d| u32::try_from(*d).ok());
        Some(Self { year, month, day })
    }

    /// Start of the period as a UTC instant, used for recency tie-breaks
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1), self.day.unwrap_or(1))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }
}

impl fmt::Display for PublishedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(m) = self.month {
            write!(f, "-{:02}", m)?;
            if let Some(d) = self.day {
                write!(f, "-{:02}", d)?;
            }
        }
        Ok(())
    }
}

/// Origin-specific fields
#[derive(Debug, Clone, PartialEq)]
pub enum OriginDetail {
    Local {
        last_visit: DateTime<Utc>,
        visit_count: u32,
    },
    External {
        pdf_url: Option<String>,
        /// Other sources that returned the same normalized URL
        also_from: Vec<Origin>,
    },
}

/// A page or paper that could be recommended
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateDocument {
    pub origin: Origin,
    pub url: String,
    pub title: String,
    pub summary: Option<String>,
    pub published: Option<PublishedDate>,
    pub authors: Vec<String>,
    pub host: String,
    pub detail: OriginDetail,
}

impl CandidateDocument {
    pub fn from_visit(record: &VisitRecord) -> Self {
        Self {
            origin: Origin::LocalHistory,
            url: record.url.clone(),
            title: record.title.clone(),
            summary: None,
            published: None,
            authors: Vec::new(),
            host: record.host.clone(),
            detail: OriginDetail::Local {
                last_visit: record.visit_time,
                visit_count: record.visit_count,
            },
        }
    }

    pub fn external(origin: Origin, url: impl Into<String>, title: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            origin,
            host: host_of(&url),
            url,
            title: title.into(),
            summary: None,
            published: None,
            authors: Vec::new(),
            detail: OriginDetail::External {
                pdf_url: None,
                also_from: Vec::new(),
            },
        }
    }

    pub fn with_summary(mut self, summary: Option<String>) -> Self {
        self.summary = summary.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_published(mut self, published: Option<PublishedDate>) -> Self {
        self.published = published;
        self
    }

    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    pub fn with_pdf_url(mut self, url: Option<String>) -> Self {
        if let OriginDetail::External { pdf_url, .. } = &mut self.detail {
            *pdf_url = url.filter(|u| !u.is_empty());
        }
        self
    }

    /// Terms used for similarity scoring.
    ///
    /// History pages use title and URL path, the same fields the interest
    /// profile is built from; literature results use title and summary.
    pub fn terms(&self) -> Vec<String> {
        match self.detail {
            OriginDetail::Local { .. } => candidate_terms(&self.title, Some(&self.url), None),
            OriginDetail::External { .. } => {
                candidate_terms(&self.title, None, self.summary.as_deref())
            }
        }
    }

    /// Most relevant date: last visit for history pages, publication date otherwise
    pub fn recency(&self) -> Option<DateTime<Utc>> {
        match &self.detail {
            OriginDetail::Local { last_visit, .. } => Some(*last_visit),
            OriginDetail::External { .. } => self.published.and_then(|p| p.as_datetime()),
        }
    }

    pub fn last_visit(&self) -> Option<DateTime<Utc>> {
        match &self.detail {
            OriginDetail::Local { last_visit, .. } => Some(*last_visit),
            OriginDetail::External { .. } => None,
        }
    }

    pub fn visit_count(&self) -> Option<u32> {
        match &self.detail {
            OriginDetail::Local { visit_count, .. } => Some(*visit_count),
            OriginDetail::External { .. } => None,
        }
    }

    pub fn pdf_url(&self) -> Option<&str> {
        match &self.detail {
            OriginDetail::External { pdf_url, .. } => pdf_url.as_deref(),
            OriginDetail::Local { .. } => None,
        }
    }

    pub fn also_from(&self) -> &[Origin] {
        match &self.detail {
            OriginDetail::External { also_from, .. } => also_from,
            OriginDetail::Local { .. } => &[],
        }
    }

    pub(crate) fn note_also_from(&mut self, other: Origin) {
        if other == self.origin {
            return;
        }
        if let OriginDetail::External { also_from, .. } = &mut self.detail {
            if !also_from.contains(&other) {
                also_from.push(other);
            }
        }
    }
}

/// A candidate with its similarity to the interest profile
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredItem {
    pub candidate: CandidateDocument,
    /// Cosine similarity in `[0, 1]`
    pub score: f64,
    /// Highest-contribution terms first, at most five
    pub why_tokens: Vec<String>,
}

impl ScoredItem {
    /// Ranking order: score descending, then most recent date, then URL.
    ///
    /// Items without a date sort after dated ones at equal score.
    pub fn ranking_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.candidate.recency().cmp(&self.candidate.recency()))
            .then_with(|| self.candidate.url.cmp(&other.candidate.url))
    }

    /// The term this item is grouped under when clustering
    pub fn dominant_term(&self) -> Option<&str> {
        self.why_tokens.first().map(String::as_str)
    }
}

/// Sort items into ranking order
pub fn rank(items: &mut [ScoredItem]) {
    items.sort_by(ScoredItem::ranking_cmp);
}
