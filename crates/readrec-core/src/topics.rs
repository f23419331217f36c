//! Topic and query inference from the interest profile
//!
//! The pipeline only needs `{topics, queries}` back. [`OpenAiTopicInference`]
//! asks the OpenAI Responses API for them; tests substitute their own
//! [`TopicInference`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::TopicsConfig;
use crate::http::{HttpClient, HttpError};

const OPENAI_RESPONSES_URL: &str = "https://api.openai.com/v1/responses";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopicError {
    #[error("OPENAI_API_KEY is not set in the environment.")]
    MissingApiKey,
    #[error("OpenAI request failed: {0}")]
    Network(#[from] HttpError),
    #[error("OpenAI API error: {status} {body}")]
    Api { status: u16, body: String },
    #[error("OpenAI refusal: {0}")]
    Refusal(String),
    #[error("OpenAI response was empty.")]
    EmptyResponse,
    #[error("OpenAI response was not valid JSON.")]
    InvalidJson,
    #[error("OpenAI did not return queries.")]
    NoQueries,
}

/// Inferred research topics and the search queries derived from them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicSuggestions {
    pub topics: Vec<String>,
    pub queries: Vec<String>,
}

#[async_trait]
pub trait TopicInference: Send + Sync {
    /// Propose topics and queries for the given interest terms and hosts
    async fn infer(
        &self,
        interest_terms: &[String],
        top_hosts: &[String],
    ) -> Result<TopicSuggestions, TopicError>;
}

pub struct OpenAiTopicInference {
    client: HttpClient,
    model: String,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiTopicInference {
    pub fn new(
        config: &TopicsConfig,
        api_key: Option<String>,
        user_agent: &str,
    ) -> Result<Self, HttpError> {
        Ok(Self {
            client: HttpClient::new(user_agent, Duration::from_secs(config.timeout_secs))?,
            model: config.model.clone(),
            api_key,
            base_url: OPENAI_RESPONSES_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl TopicInference for OpenAiTopicInference {
    async fn infer(
        &self,
        interest_terms: &[String],
        top_hosts: &[String],
    ) -> Result<TopicSuggestions, TopicError> {
        let api_key = self.api_key.as_deref().ok_or(TopicError::MissingApiKey)?;
        let payload = json!({
            "model": self.model,
            "input": [
                {"role": "system", "content": "You must return JSON only."},
                {"role": "user", "content": build_prompt(interest_terms, top_hosts)},
            ],
            "text": {"format": {"type": "json_object"}},
        });
        let auth = format!("Bearer {}", api_key);

        let response = self
            .client
            .post_json(&self.base_url, &payload, &[("Authorization", auth.as_str())])
            .await?;
        if response.status >= 400 {
            return Err(TopicError::Api {
                status: response.status,
                body: response.body,
            });
        }

        let suggestions = parse_response(&response.body)?;
        tracing::info!(
            "Inferred {} topics and {} queries",
            suggestions.topics.len(),
            suggestions.queries.len()
        );
        Ok(suggestions)
    }
}

pub fn build_prompt(interest_terms: &[String], top_hosts: &[String]) -> String {
    let interests = if interest_terms.is_empty() {
        "general topics".to_string()
    } else {
        interest_terms.join(", ")
    };
    let hosts = if top_hosts.is_empty() {
        "n/a".to_string()
    } else {
        top_hosts.join(", ")
    };
    format!(
        "You are a research assistant. Given recent browsing interests, propose literature search queries.\n\
         Return JSON only with keys: queries (list of 3-6 concise query strings), topics (list of 4-8 short topics).\n\
         Keep queries short and focused.\n\
         \n\
         Interests: {}\n\
         Top hosts: {}",
        interests, hosts
    )
}

/// Parse a full Responses API body into suggestions
pub fn parse_response(body: &str) -> Result<TopicSuggestions, TopicError> {
    let payload: Value = serde_json::from_str(body).map_err(|_| TopicError::InvalidJson)?;
    if let Some(refusal) = payload.get("refusal").and_then(Value::as_str) {
        if !refusal.is_empty() {
            return Err(TopicError::Refusal(refusal.to_string()));
        }
    }
    let text = extract_response_text(&payload);
    if text.is_empty() {
        return Err(TopicError::EmptyResponse);
    }
    parse_suggestions(&text)
}

/// Concatenate the text parts of `output[].content[]`
pub fn extract_response_text(payload: &Value) -> String {
    let mut chunks = Vec::new();
    for output in payload
        .get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        for content in output
            .get("content")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let kind = content.get("type").and_then(Value::as_str);
            if matches!(kind, Some("output_text") | Some("text")) {
                if let Some(text) = content.get("text").and_then(Value::as_str) {
                    chunks.push(text);
                }
            }
        }
    }
    chunks.join("\n").trim().to_string()
}

/// The outermost `{...}` span of `text`, if it parses as JSON
pub fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Read `{queries, topics}` from model output, tolerating prose around the JSON
pub fn parse_suggestions(text: &str) -> Result<TopicSuggestions, TopicError> {
    let value = serde_json::from_str::<Value>(text)
        .ok()
        .filter(Value::is_object)
        .or_else(|| extract_json_object(text))
        .ok_or(TopicError::InvalidJson)?;

    let queries = string_list(value.get("queries"));
    if queries.is_empty() {
        return Err(TopicError::NoQueries);
    }
    Ok(TopicSuggestions {
        topics: string_list(value.get("topics")),
        queries,
    })
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                })
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
