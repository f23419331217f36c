//! readrec-core: reading recommendations from browser history
//!
//! Builds a short-term interest profile from recently visited pages, then
//! resurfaces older pages that match it and searches arXiv, Crossref and
//! Semantic Scholar for new literature on the same topics.

pub mod aggregator;
pub mod assemble;
pub mod candidate;
pub mod cluster;
pub mod config;
pub mod error;
pub mod filter;
pub mod history;
pub mod http;
pub mod profile;
pub mod recommender;
pub mod scorer;
pub mod sources;
pub mod text;
pub mod topics;

pub use aggregator::{Aggregated, AggregatorSettings, EnabledSources, ExternalAggregator};
pub use assemble::{
    CliRow, LocalReport, NewRecommendations, ReportStatus, ResultAssembler, WebItem, WebReport,
    EMPTY_SIGNAL_MESSAGE,
};
pub use candidate::{CandidateDocument, Origin, OriginDetail, PublishedDate, ScoredItem};
pub use cluster::{Cluster, ClusterSummary, Clusterer, UNCLUSTERED};
pub use config::{ConfigError, Credentials, RecommenderConfig, SourcesConfig, TopicsConfig};
pub use error::{RecError, Result};
pub use filter::ReadingFilter;
pub use history::{resolve_history_path, ChromeHistoryReader, HistoryReader, VisitRecord};
pub use profile::{InterestProfile, ProfileBuilder, RecencyWindow};
pub use recommender::{parse_since, RecommendOptions, Recommender};
pub use scorer::CandidateScorer;
pub use sources::{default_sources, LiteratureSource, SourceError};
pub use topics::{OpenAiTopicInference, TopicError, TopicInference, TopicSuggestions};
