//! Text normalization and term-vector math
//!
//! Every similarity score in the pipeline compares two vectors produced by
//! [`candidate_terms`]. The interest profile, local history candidates and
//! external documents all go through it, so a change to tokenization changes
//! both sides of the comparison at once.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use url::Url;

/// Tokens shorter than this are dropped
pub const MIN_TOKEN_LEN: usize = 3;

lazy_static! {
    static ref STOPWORDS: HashSet<&'static str> = [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have",
        "if", "in", "into", "is", "it", "its", "of", "on", "or", "that", "the", "their",
        "there", "to", "was", "were", "will", "with", "you", "your",
    ]
    .into_iter()
    .collect();
}

/// Sparse term -> weight vector
pub type TermVector = HashMap<String, f64>;

/// Split text into lowercase ASCII alphanumeric terms.
///
/// Diacritics are folded (`Café` -> `cafe`), any other non-alphanumeric
/// character separates terms, and stopwords and short terms are removed.
pub fn tokenize(text: &str) -> Vec<String> {
    let folded: String = text
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_ascii_lowercase();

    folded
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() >= MIN_TOKEN_LEN && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

pub fn is_stopword(term: &str) -> bool {
    STOPWORDS.contains(term)
}

/// Terms from the path component of a URL. Host, query and fragment are ignored.
pub fn url_path_terms(url: &str) -> Vec<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let decoded = urlencoding::decode(&path)
        .map(|d| d.into_owned())
        .unwrap_or(path);
    tokenize(&decoded.replace('/', " "))
}

/// The single tokenization entry point for profile and candidates.
///
/// History pages contribute title and URL path; literature results
/// contribute title and summary.
pub fn candidate_terms(title: &str, url: Option<&str>, summary: Option<&str>) -> Vec<String> {
    let mut terms = tokenize(title);
    if let Some(url) = url {
        terms.extend(url_path_terms(url));
    }
    if let Some(summary) = summary {
        terms.extend(tokenize(summary));
    }
    terms
}

/// Raw term-frequency vector
pub fn term_vector<I, S>(terms: I) -> TermVector
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut vec = TermVector::new();
    for term in terms {
        *vec.entry(term.into()).or_insert(0.0) += 1.0;
    }
    vec
}

fn norm(v: &TermVector) -> f64 {
    v.values().map(|w| w * w).sum::<f64>().sqrt()
}

/// Cosine similarity clamped to `[0, 1]`. Zero-norm inputs score 0.
pub fn cosine(a: &TermVector, b: &TermVector) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(k, v)| large.get(k).map(|w| v * w))
        .sum();

    let denom = norm(a) * norm(b);
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    (dot / denom).clamp(0.0, 1.0)
}

/// Terms ranked by their contribution to `cosine(profile, doc)`.
///
/// Only terms present on both sides are returned, highest contribution
/// first, ties broken alphabetically.
pub fn top_contributors(profile: &TermVector, doc: &TermVector, top: usize) -> Vec<String> {
    if top == 0 {
        return Vec::new();
    }
    let mut contributions: Vec<(f64, &String)> = doc
        .iter()
        .filter_map(|(term, weight)| {
            let c = weight * profile.get(term).copied().unwrap_or(0.0);
            (c > 0.0).then_some((c, term))
        })
        .collect();
    contributions.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    contributions
        .into_iter()
        .take(top)
        .map(|(_, t)| t.clone())
        .collect()
}

/// Heaviest terms of a vector, ties broken alphabetically
pub fn heaviest_terms(v: &TermVector, top: usize) -> Vec<String> {
    let mut ranked: Vec<(&String, &f64)> = v.iter().collect();
    ranked.sort_by(|a, b| match b.1.total_cmp(a.1) {
        Ordering::Equal => a.0.cmp(b.0),
        other => other,
    });
    ranked.into_iter().take(top).map(|(t, _)| t.clone()).collect()
}

/// Normalize a URL for deduplication: scheme, host and path only.
///
/// Query string and fragment are dropped, host and scheme are lowercased,
/// and a trailing slash on a non-root path is removed.
pub fn normalize_url(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
            let mut path = parsed.path().to_string();
            if path.len() > 1 && path.ends_with('/') {
                path.pop();
            }
            if path == "/" {
                path.clear();
            }
            format!("{}://{}{}", parsed.scheme(), host, path)
        }
        Err(_) => {
            let base = url.trim().split(['?', '#']).next().unwrap_or_default();
            base.trim_end_matches('/').to_ascii_lowercase()
        }
    }
}

/// Lowercased host of a URL, empty when it has none
pub fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tokenize_basic() {
        assert_eq!(
            tokenize("Tuning Postgres Indexes for the Win"),
            vec!["tuning", "postgres", "indexes", "win"]
        );
    }

    #[test]
    fn test_tokenize_drops_short_and_stopwords() {
        assert_eq!(tokenize("an API to go in"), vec!["api"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_tokenize_folds_diacritics() {
        assert_eq!(tokenize("Café Münster"), vec!["cafe", "munster"]);
    }

    #[test]
    fn test_tokenize_splits_on_punctuation() {
        assert_eq!(
            tokenize("postgres-indexes_v2:btree"),
            vec!["postgres", "indexes", "btree"]
        );
    }

    #[test]
    fn test_url_path_terms_ignore_host_and_query() {
        let terms = url_path_terms("https://blog.example.com/posts/postgres-indexes?utm=newsletter");
        assert_eq!(terms, vec!["posts", "postgres", "indexes"]);
    }

    #[test]
    fn test_url_path_terms_decode_percent_escapes() {
        let terms = url_path_terms("https://example.com/wiki/Query%20planner");
        assert_eq!(terms, vec!["wiki", "query", "planner"]);
    }

    #[test]
    fn test_candidate_terms_combines_parts() {
        let terms = candidate_terms(
            "Index tuning",
            Some("https://example.com/postgres"),
            Some("btree internals"),
        );
        assert_eq!(terms, vec!["index", "tuning", "postgres", "btree", "internals"]);
    }

    #[test]
    fn test_cosine_identical_is_one() {
        let a = term_vector(["postgres", "index", "index"]);
        assert!((cosine(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_proportional_is_one() {
        let a: TermVector = [("postgres".to_string(), 1.0), ("index".to_string(), 2.0)].into();
        let b: TermVector = [("postgres".to_string(), 3.0), ("index".to_string(), 6.0)].into();
        assert!((cosine(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_disjoint_is_zero() {
        let a = term_vector(["postgres"]);
        let b = term_vector(["rust"]);
        assert_eq!(cosine(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_empty_is_zero() {
        let a = term_vector(["postgres"]);
        assert_eq!(cosine(&a, &TermVector::new()), 0.0);
        assert_eq!(cosine(&TermVector::new(), &TermVector::new()), 0.0);
    }

    #[test]
    fn test_top_contributors_order() {
        let profile: TermVector = [
            ("postgres".to_string(), 3.0),
            ("index".to_string(), 1.0),
            ("rust".to_string(), 5.0),
        ]
        .into();
        let doc = term_vector(["index", "postgres", "tuning"]);
        assert_eq!(top_contributors(&profile, &doc, 5), vec!["postgres", "index"]);
        assert_eq!(top_contributors(&profile, &doc, 1), vec!["postgres"]);
        assert!(top_contributors(&profile, &doc, 0).is_empty());
    }

    #[test]
    fn test_top_contributors_ties_alphabetical() {
        let profile = term_vector(["beta", "alpha"]);
        let doc = term_vector(["alpha", "beta"]);
        assert_eq!(top_contributors(&profile, &doc, 5), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("HTTPS://Arxiv.org/abs/2301.12345/?utm_source=x#frag"),
            "https://arxiv.org/abs/2301.12345"
        );
        assert_eq!(normalize_url("https://example.com/"), "https://example.com");
        assert_eq!(
            normalize_url("https://example.com/a?b=1"),
            normalize_url("https://example.com/a")
        );
    }

    #[test]
    fn test_normalize_url_unparseable() {
        assert_eq!(normalize_url("not a url/?x=1"), "not a url");
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://WWW.Example.com/x"), "www.example.com");
        assert_eq!(host_of("garbage"), "");
    }

    proptest! {
        #[test]
        fn prop_cosine_in_unit_interval(
            a in proptest::collection::hash_map("[a-e]{3}", 0.0f64..100.0, 0..8),
            b in proptest::collection::hash_map("[a-e]{3}", 0.0f64..100.0, 0..8),
        ) {
            let s = cosine(&a, &b);
            prop_assert!((0.0..=1.0).contains(&s));
        }

        #[test]
        fn prop_tokens_are_lowercase_alnum(text in ".{0,64}") {
            for t in tokenize(&text) {
                prop_assert!(t.len() >= MIN_TOKEN_LEN);
                prop_assert!(t.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
                prop_assert!(!is_stopword(&t));
            }
        }
    }
}
