//! Grouping ranked items by their dominant explanatory term

use std::collections::HashMap;

use serde::Serialize;

use crate::candidate::{rank, ScoredItem};

/// Name of the single group emitted when clustering is off
pub const UNCLUSTERED: &str = "unclustered";

/// Size and most common why-tokens of a cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterSummary {
    pub count: usize,
    pub top_tokens: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub name: String,
    /// Ranking order
    pub items: Vec<ScoredItem>,
    pub summary: ClusterSummary,
}

impl Cluster {
    pub fn total_score(&self) -> f64 {
        self.items.iter().map(|i| i.score).sum()
    }
}

/// Caps, then groups, a set of scored items
#[derive(Debug, Clone)]
pub struct Clusterer {
    enabled: bool,
    limit: usize,
    summary_top: usize,
}

impl Clusterer {
    pub fn new(enabled: bool, limit: usize) -> Self {
        Self {
            enabled,
            limit,
            summary_top: 5,
        }
    }

    pub fn summary_top(mut self, summary_top: usize) -> Self {
        self.summary_top = summary_top;
        self
    }

    /// Rank `items`, keep the `limit` best globally, and group them.
    ///
    /// Clusters are ordered by summed score, highest first, then by name.
    /// With clustering disabled the result is one [`UNCLUSTERED`] group, or
    /// nothing when there are no items.
    pub fn cluster(&self, mut items: Vec<ScoredItem>) -> Vec<Cluster> {
        rank(&mut items);
        items.truncate(self.limit);
        if items.is_empty() {
            return Vec::new();
        }

        if !self.enabled {
            let summary = self.summarize(&items);
            return vec![Cluster {
                name: UNCLUSTERED.to_string(),
                items,
                summary,
            }];
        }

        let mut groups: Vec<(String, Vec<ScoredItem>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for item in items {
            let key = cluster_key(&item);
            match index.get(&key) {
                Some(&i) => groups[i].1.push(item),
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push((key, vec![item]));
                }
            }
        }

        let mut clusters: Vec<Cluster> = groups
            .into_iter()
            .map(|(name, items)| Cluster {
                summary: self.summarize(&items),
                name,
                items,
            })
            .collect();
        clusters.sort_by(|a, b| {
            b.total_score()
                .total_cmp(&a.total_score())
                .then_with(|| a.name.cmp(&b.name))
        });
        clusters
    }

    fn summarize(&self, items: &[ScoredItem]) -> ClusterSummary {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for token in items.iter().flat_map(|i| i.why_tokens.iter()) {
            *counts.entry(token.as_str()).or_insert(0) += 1;
        }
        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ClusterSummary {
            count: items.len(),
            top_tokens: ranked
                .into_iter()
                .take(self.summary_top)
                .map(|(t, _)| t.to_string())
                .collect(),
        }
    }
}

/// Dominant why-token, else host, else `other`
fn cluster_key(item: &ScoredItem) -> String {
    if let Some(term) = item.dominant_term() {
        return term.to_string();
    }
    if !item.candidate.host.is_empty() {
        return item.candidate.host.clone();
    }
    "other".to_string()
}
