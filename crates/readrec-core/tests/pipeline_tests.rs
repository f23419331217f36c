//! End-to-end pipeline tests
//!
//! History comes from SQLite fixtures; literature sources and topic inference
//! are in-process fakes.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::fixtures::{now, row, HistoryFixture};
use proptest::prelude::*;
use readrec_core::{
    CandidateDocument, ChromeHistoryReader, EnabledSources, HistoryReader, LiteratureSource,
    Origin, RecommendOptions, Recommender, RecommenderConfig, ReportStatus, SourceError,
    TopicError, TopicInference, TopicSuggestions, VisitRecord, EMPTY_SIGNAL_MESSAGE,
};

struct FixedTopics(Result<TopicSuggestions, TopicError>);

#[async_trait]
impl TopicInference for FixedTopics {
    async fn infer(
        &self,
        _interest_terms: &[String],
        _top_hosts: &[String],
    ) -> Result<TopicSuggestions, TopicError> {
        self.0.clone()
    }
}

fn topics_ok() -> FixedTopics {
    FixedTopics(Ok(TopicSuggestions {
        topics: vec!["databases".to_string()],
        queries: vec!["postgres indexes".to_string(), "btree tuning".to_string()],
    }))
}

struct StubSource {
    origin: Origin,
    stall: bool,
}

#[async_trait]
impl LiteratureSource for StubSource {
    fn origin(&self) -> Origin {
        self.origin
    }

    async fn search(
        &self,
        query: &str,
        _max_results: u32,
    ) -> Result<Vec<CandidateDocument>, SourceError> {
        if self.stall {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        let slug = query.replace(' ', "-");
        Ok(vec![CandidateDocument::external(
            self.origin,
            format!("https://{}.example/{}", self.origin.id(), slug),
            format!("Advances in {}", query),
        )
        .with_summary(Some("Indexes for Postgres workloads".to_string()))])
    }
}

fn stub_sources(stalled: Option<Origin>) -> Vec<Arc<dyn LiteratureSource>> {
    Origin::EXTERNAL
        .iter()
        .map(|&origin| {
            Arc::new(StubSource {
                origin,
                stall: stalled == Some(origin),
            }) as Arc<dyn LiteratureSource>
        })
        .collect()
}

fn quick_timeout_recommender() -> Recommender {
    let mut config = RecommenderConfig::default();
    config.sources.timeout_secs = 1;
    Recommender::new(config)
}

fn postgres_history() -> Vec<VisitRecord> {
    let fixture = HistoryFixture::new(&[
        row("https://notes.example/postgres-indexes", "Notes", 3, 3),
        row("https://blog.example/tuning", "Tuning Postgres Indexes", 5, 40),
        row("https://garden.example/tomatoes", "Growing tomatoes", 6, 50),
    ]);
    ChromeHistoryReader.read(&fixture.path).unwrap()
}

#[test]
fn test_resurfaces_older_postgres_page() {
    let options = RecommendOptions {
        min_visits: 1,
        recent_days: 14,
        ..RecommendOptions::default()
    };
    let report = Recommender::default()
        .recommend_local(&postgres_history(), &options, now())
        .unwrap();

    assert_eq!(report.status, ReportStatus::Ok);
    assert_eq!(report.item_count(), 1);
    let item = &report.clusters[0].items[0];
    assert_eq!(item.candidate.url, "https://blog.example/tuning");
    assert!(item.score > 0.0 && item.score <= 1.0);
    assert!(item.why_tokens.iter().any(|t| t == "postgres"));
}

#[test]
fn test_local_runs_are_deterministic() {
    let records = postgres_history();
    let options = RecommendOptions::default();
    let recommender = Recommender::default();
    let first = recommender.recommend_local(&records, &options, now()).unwrap();
    let second = recommender.recommend_local(&records, &options, now()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_no_recent_history_is_empty_signal() {
    let fixture = HistoryFixture::new(&[row("https://blog.example/tuning", "Tuning Postgres", 5, 40)]);
    let records = ChromeHistoryReader.read(&fixture.path).unwrap();
    let report = Recommender::default()
        .recommend_local(&records, &RecommendOptions::default(), now())
        .unwrap();
    assert_eq!(report.status, ReportStatus::EmptySignal);
    assert_eq!(report.item_count(), 0);
}

#[tokio::test]
async fn test_all_sources_disabled() {
    let options = RecommendOptions {
        sources: EnabledSources::none(),
        ..RecommendOptions::default()
    };
    let report = Recommender::default()
        .recommend_new(&postgres_history(), &options, &topics_ok(), &stub_sources(None), now())
        .await
        .unwrap();

    assert!(report.new_recommendations.arxiv.is_empty());
    assert!(report.new_recommendations.crossref.is_empty());
    assert!(report.new_recommendations.semantic_scholar.is_empty());
    assert!(report.warnings.is_empty());
    assert!(report.interest_tokens.contains(&"postgres".to_string()));
}

#[tokio::test]
async fn test_crossref_timeout_leaves_other_sources_intact() {
    let report = quick_timeout_recommender()
        .recommend_new(
            &postgres_history(),
            &RecommendOptions::default(),
            &topics_ok(),
            &stub_sources(Some(Origin::Crossref)),
            now(),
        )
        .await
        .unwrap();

    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("Crossref"));
    assert!(report.new_recommendations.crossref.is_empty());
    assert_eq!(report.new_recommendations.arxiv.len(), 2);
    assert_eq!(report.new_recommendations.semantic_scholar.len(), 2);
    assert!(report
        .new_recommendations
        .arxiv
        .iter()
        .all(|item| item.score > 0.0 && !item.why.is_empty()));
    assert_eq!(report.queries.len(), 2);
    assert_eq!(report.topics, vec!["databases"]);
}

#[tokio::test]
async fn test_topic_failure_degrades_to_no_queries() {
    let report = Recommender::default()
        .recommend_new(
            &postgres_history(),
            &RecommendOptions::default(),
            &FixedTopics(Err(TopicError::MissingApiKey)),
            &stub_sources(None),
            now(),
        )
        .await
        .unwrap();

    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].starts_with("Topic inference unavailable"));
    assert!(report.queries.is_empty());
    assert!(report.new_recommendations.is_empty());
}

#[tokio::test]
async fn test_web_empty_signal_warns() {
    let records = vec![VisitRecord::new(
        "https://blog.example/tuning",
        "Tuning Postgres",
        now() - chrono::Duration::days(90),
        4,
    )];
    let report = Recommender::default()
        .recommend_new(&records, &RecommendOptions::default(), &topics_ok(), &stub_sources(None), now())
        .await
        .unwrap();
    assert_eq!(report.warnings, vec![EMPTY_SIGNAL_MESSAGE.to_string()]);
    assert!(report.new_recommendations.is_empty());
}

#[tokio::test]
async fn test_web_limit_caps_each_origin() {
    let options = RecommendOptions {
        limit: 1,
        ..RecommendOptions::default()
    };
    let report = Recommender::default()
        .recommend_new(&postgres_history(), &options, &topics_ok(), &stub_sources(None), now())
        .await
        .unwrap();
    assert_eq!(report.new_recommendations.arxiv.len(), 1);
    assert_eq!(report.new_recommendations.crossref.len(), 1);
    assert_eq!(report.new_recommendations.semantic_scholar.len(), 1);
}

const WORDS: [&str; 6] = ["rust", "postgres", "btree", "compiler", "async", "index"];

fn synthetic_history(entries: &[(usize, usize, i64, u32)]) -> Vec<VisitRecord> {
    entries
        .iter()
        .enumerate()
        .map(|(i, (a, b, days, count))| {
            VisitRecord::new(
                format!("https://h{}.example/p{}", i % 5, i),
                format!("{} {}", WORDS[*a], WORDS[*b]),
                now() - chrono::Duration::days(*days),
                *count,
            )
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_limit_keeps_globally_best(
        entries in proptest::collection::vec((0usize..6, 0usize..6, 0i64..60, 1u32..6), 1..25),
        limit in 0usize..10,
    ) {
        let records = synthetic_history(&entries);
        let recommender = Recommender::default();

        let all = recommender
            .recommend_local(
                &records,
                &RecommendOptions { limit: usize::MAX, cluster: false, ..RecommendOptions::default() },
                now(),
            )
            .unwrap();
        let capped = recommender
            .recommend_local(&records, &RecommendOptions { limit, ..RecommendOptions::default() }, now())
            .unwrap();

        prop_assert!(capped.item_count() <= limit);
        let ranked: Vec<String> = all
            .clusters
            .iter()
            .flat_map(|c| c.items.iter().map(|i| i.candidate.url.clone()))
            .collect();
        let mut expected: Vec<String> = ranked.into_iter().take(limit).collect();
        let mut got: Vec<String> = capped
            .clusters
            .iter()
            .flat_map(|c| c.items.iter().map(|i| i.candidate.url.clone()))
            .collect();
        expected.sort();
        got.sort();
        prop_assert_eq!(got, expected);

        for item in capped.clusters.iter().flat_map(|c| c.items.iter()) {
            prop_assert!(item.score > 0.0 && item.score <= 1.0);
        }
    }
}
